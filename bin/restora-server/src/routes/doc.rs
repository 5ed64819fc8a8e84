use utoipa::OpenApi;

use crate::routes::{health, jobs};

#[derive(OpenApi)]
#[openapi(info(
    title = "restora-server",
    description = "Asynchronous face restoration, colorization and inpainting jobs",
    contact(name = "restora", url = "https://github.com/Cyberhan123/restora")
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(jobs::JobsApi::openapi());
    root.merge(health::HealthApi::openapi());
    root
}
