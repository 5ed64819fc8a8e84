//! restora-gateway – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing.
//! 3. Build the object store and purger.
//! 4. Serve the Axum router with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use restora_gateway::{routes, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    restora_utils::init_tracing(&cfg.log_level, cfg.log_json, "GATEWAY_LOG");

    info!(version = env!("CARGO_PKG_VERSION"), "restora-gateway starting");

    // ── 3. Storage backend + purge ─────────────────────────────────────────────
    let bind_address = cfg.bind_address.clone();
    let state = Arc::new(AppState::from_config(cfg)?);
    info!(
        backend = %state.gateway.backend(),
        purge_enabled = state.gateway.purge_enabled(),
        public_base_url = %state.config.public_base_url,
        "storage ready"
    );

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(state);
    let addr: SocketAddr = bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(restora_utils::shutdown_signal())
        .await?;

    info!("restora-gateway stopped");
    Ok(())
}
