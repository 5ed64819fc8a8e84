//! Health / heartbeat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::debug;
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(ServerHealth)))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServerHealth {
    /// `healthy` when CodeFormer and the gateway are both usable, else `degraded`.
    pub status: &'static str,
    pub version: &'static str,
    pub codeformer_available: bool,
    pub gateway_reachable: bool,
}

/// Always 200 while the process is up; the body says whether jobs can
/// actually complete.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Server is up", body = ServerHealth))
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<ServerHealth> {
    let codeformer_available = state.codeformer.scripts_present().await;
    let gateway_reachable = gateway_reachable(&state).await;
    let status = if codeformer_available && gateway_reachable { "healthy" } else { "degraded" };

    Json(ServerHealth {
        status,
        version: env!("CARGO_PKG_VERSION"),
        codeformer_available,
        gateway_reachable,
    })
}

async fn gateway_reachable(state: &AppState) -> bool {
    let url = format!("{}/health", state.config.gateway_url.trim_end_matches('/'));
    match state.http.get(&url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            debug!(error = %e, %url, "gateway health probe failed");
            false
        }
    }
}
