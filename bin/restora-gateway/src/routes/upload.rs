//! Upload ingress endpoints: multipart bytes, remote URL, and local path.

use std::path::Path;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use restora_types::{filename_from_url, ErrorBody, LocalUploadRequest, UploadResponse, UrlUploadRequest};
use tracing::debug;
use utoipa::{OpenApi, ToSchema};

use crate::error::GatewayError;
use crate::service::KeySpec;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(upload_file, upload_url, upload_local),
    components(schemas(UploadFileForm, UploadResponse, UrlUploadRequest, LocalUploadRequest, ErrorBody))
)]
pub struct UploadApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload/file", post(upload_file))
        .route("/upload/url", post(upload_url))
        .route("/upload/local", post(upload_local))
}

/// `multipart/form-data` body of `POST /upload/file`.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct UploadFileForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    key: Option<String>,
    user_id: Option<String>,
    /// Overrides the uploaded file's own name when the key is derived.
    filename: Option<String>,
}

#[utoipa::path(
    post,
    path = "/upload/file",
    tag = "upload",
    request_body(content = UploadFileForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Invalid key, missing file, or too large", body = ErrorBody),
        (status = 500, description = "Object store failure", body = ErrorBody),
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, GatewayError> {
    let limit = state.gateway.max_upload_bytes();
    let mut spec = KeySpec::default();
    let mut file: Option<(Vec<u8>, Option<String>, Option<String>)> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let mut buf = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    buf.extend_from_slice(&chunk);
                    if buf.len() as u64 > limit {
                        return Err(GatewayError::Validation(format!(
                            "upload exceeds the {limit} byte limit"
                        )));
                    }
                }
                file = Some((buf, file_name, content_type));
            }
            "key" => spec.key = Some(field.text().await?),
            "user_id" => spec.user_id = Some(field.text().await?),
            "filename" => spec.filename = Some(field.text().await?),
            other => return Err(GatewayError::Validation(format!("unknown field: {other}"))),
        }
    }

    let Some((body, file_name, content_type)) = file else {
        return Err(GatewayError::Validation("no file uploaded".into()));
    };
    let key = state.gateway.resolve_key(&spec, file_name.as_deref())?;
    debug!(key = %key, size = body.len(), "received file upload");

    let out = state
        .gateway
        .upload_bytes(&key, Bytes::from(body), content_type.as_deref())
        .await?;
    Ok(Json(out))
}

#[utoipa::path(
    post,
    path = "/upload/url",
    tag = "upload",
    request_body = UrlUploadRequest,
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Invalid key or URL, or source too large", body = ErrorBody),
        (status = 502, description = "Source fetch failed", body = ErrorBody),
        (status = 504, description = "Source fetch timed out", body = ErrorBody),
    )
)]
pub async fn upload_url(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UrlUploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, GatewayError> {
    let Json(req) = payload?;
    let spec = KeySpec { key: req.key, user_id: req.user_id, filename: None };
    let fallback = filename_from_url(&req.image_url);
    let key = state.gateway.resolve_key(&spec, fallback.as_deref())?;
    Ok(Json(state.gateway.upload_url(&req.image_url, &key).await?))
}

/// Upload a file already on the gateway's filesystem. This is the endpoint
/// the processing service delegates to; it needs a volume both can see.
#[utoipa::path(
    post,
    path = "/upload/local",
    tag = "upload",
    request_body = LocalUploadRequest,
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Invalid key", body = ErrorBody),
        (status = 404, description = "Local file does not exist", body = ErrorBody),
        (status = 500, description = "Object store failure", body = ErrorBody),
    )
)]
pub async fn upload_local(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LocalUploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, GatewayError> {
    let Json(req) = payload?;
    let spec = KeySpec { key: Some(req.key), ..Default::default() };
    let key = state.gateway.resolve_key(&spec, None)?;
    Ok(Json(state.gateway.upload_local(Path::new(&req.path), &key).await?))
}
