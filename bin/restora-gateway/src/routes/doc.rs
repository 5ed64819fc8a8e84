use utoipa::OpenApi;

use crate::routes::{health, objects, upload};

#[derive(OpenApi)]
#[openapi(info(
    title = "restora-gateway",
    description = "Durable object writes with public URLs and CDN purge",
    contact(name = "restora", url = "https://github.com/Cyberhan123/restora")
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(upload::UploadApi::openapi());
    root.merge(objects::ObjectsApi::openapi());
    root.merge(health::HealthApi::openapi());
    root
}
