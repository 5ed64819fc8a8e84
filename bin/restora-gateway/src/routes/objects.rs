use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use restora_types::{DeleteObjectRequest, DeleteObjectResponse, ErrorBody};
use utoipa::OpenApi;

use crate::error::GatewayError;
use crate::service::KeySpec;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(delete_object, get_object),
    components(schemas(DeleteObjectRequest, DeleteObjectResponse))
)]
pub struct ObjectsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/objects", delete(delete_object))
        .route("/objects/{*key}", get(get_object))
}

/// Serve a stored object, so the default public base URL resolves without a CDN.
#[utoipa::path(
    get,
    path = "/objects/{key}",
    tag = "objects",
    params(("key" = String, Path, description = "Object key; may contain slashes")),
    responses(
        (status = 200, description = "Object bytes"),
        (status = 400, description = "Invalid key", body = ErrorBody),
        (status = 404, description = "Object does not exist", body = ErrorBody),
    )
)]
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, GatewayError> {
    let object = state.gateway.get_object(&key).await?;
    Ok((
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::CONTENT_LENGTH, object.size.to_string()),
        ],
        Body::from_stream(object.body),
    )
        .into_response())
}

/// Delete by `key`, or by `user_id` + `filename`. The CDN is not purged.
#[utoipa::path(
    delete,
    path = "/objects",
    tag = "objects",
    request_body = DeleteObjectRequest,
    responses(
        (status = 200, description = "Deleted", body = DeleteObjectResponse),
        (status = 400, description = "Invalid key", body = ErrorBody),
        (status = 404, description = "Object does not exist", body = ErrorBody),
    )
)]
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteObjectRequest>, JsonRejection>,
) -> Result<Json<DeleteObjectResponse>, GatewayError> {
    let Json(req) = payload?;
    if req.key.is_none() && req.filename.is_none() {
        return Err(GatewayError::Validation(
            "either key or user_id with filename is required".into(),
        ));
    }
    let spec = KeySpec { key: req.key, user_id: req.user_id, filename: req.filename };
    let key = state.gateway.resolve_key(&spec, None)?;
    state.gateway.delete(&key).await?;
    Ok(Json(DeleteObjectResponse { success: true, storage_key: key }))
}
