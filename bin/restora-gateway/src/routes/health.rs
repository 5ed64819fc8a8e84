//! Health / heartbeat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;
use crate::storage::BackendKind;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(GatewayHealth, BackendKind)))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GatewayHealth {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: BackendKind,
    pub purge_enabled: bool,
}

/// Liveness plus which backend is active and whether purges are sent.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Gateway is up", body = GatewayHealth))
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<GatewayHealth> {
    Json(GatewayHealth {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.gateway.backend(),
        purge_enabled: state.gateway.purge_enabled(),
    })
}
