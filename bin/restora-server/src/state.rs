//! Shared application state injected into every Axum handler.

use std::sync::Arc;
use std::time::Duration;

use restora_core::Orchestrator;

use crate::config::Config;
use crate::transform::CodeFormerTransform;

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    pub orchestrator: Orchestrator,
    /// Kept for health checks; the pipeline holds its own handle.
    pub codeformer: Arc<CodeFormerTransform>,
    /// Client used to probe the gateway's `/health`.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Orchestrator,
        codeformer: Arc<CodeFormerTransform>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .no_proxy()
            .timeout(HEALTH_PROBE_TIMEOUT)
            .build()?;
        Ok(Self { config: Arc::new(config), orchestrator, codeformer, http })
    }
}
