//! restora-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing.
//! 3. Prepare the work directory and wire fetcher, transform, and upload delegate.
//! 4. Serve the Axum router with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;
mod transform;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use restora_core::{HttpUploadDelegate, Orchestrator, Pipeline, PipelineConfig};
use restora_fetch::Fetcher;
use tracing::{info, warn};

use crate::state::AppState;
use crate::transform::CodeFormerTransform;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = config::Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    restora_utils::init_tracing(&cfg.log_level, cfg.log_json, "RESTORA_LOG");

    info!(version = env!("CARGO_PKG_VERSION"), "restora-server starting");

    // ── 3. Pipeline ────────────────────────────────────────────────────────────
    // The gateway reads artifacts by path, so the work dir must be absolute.
    tokio::fs::create_dir_all(&cfg.work_dir)
        .await
        .with_context(|| format!("creating work dir {}", cfg.work_dir.display()))?;
    let work_dir = tokio::fs::canonicalize(&cfg.work_dir).await?;

    let fetcher = Fetcher::builder()
        .set_timeout(Duration::from_secs(cfg.fetch_timeout_secs))
        .set_max_bytes(cfg.max_source_mb.saturating_mul(1024 * 1024))
        .build()?;
    let delegate = HttpUploadDelegate::new(&cfg.gateway_url, Duration::from_secs(cfg.upload_timeout_secs))
        .context("building gateway client")?;
    let codeformer = Arc::new(CodeFormerTransform::new(
        &cfg.codeformer_dir,
        cfg.python.clone(),
        Duration::from_secs(cfg.transform_timeout_secs),
    ));
    if !codeformer.scripts_present().await {
        warn!(dir = %codeformer.dir().display(), "CodeFormer scripts not found; jobs will fail at the transform stage");
    }

    let pipeline = Pipeline::new(
        PipelineConfig { work_dir: work_dir.clone(), key_prefix: cfg.key_prefix.clone() },
        fetcher,
        codeformer.clone(),
        Arc::new(delegate),
    );
    let orchestrator = Orchestrator::new(pipeline, cfg.max_concurrent_jobs);
    info!(
        work_dir = %work_dir.display(),
        gateway = %cfg.gateway_url,
        max_concurrent_jobs = cfg.max_concurrent_jobs,
        "pipeline ready"
    );

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let bind_address = cfg.bind_address.clone();
    let state = Arc::new(AppState::new(cfg, orchestrator, codeformer)?);
    let app = routes::build(state);
    let addr: SocketAddr = bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(restora_utils::shutdown_signal())
        .await?;

    info!("restora-server stopped");
    Ok(())
}
