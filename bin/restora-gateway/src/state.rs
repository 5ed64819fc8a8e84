//! Shared application state injected into every Axum handler.

use std::sync::Arc;
use std::time::Duration;

use restora_fetch::Fetcher;
use tracing::info;

use crate::config::Config;
use crate::error::GatewayError;
use crate::purge::{CachePurger, CloudflarePurger, DisabledPurger};
use crate::service::{Gateway, GatewaySettings};
use crate::storage::build_object_store;

#[derive(Clone, Debug)]
pub struct AppState {
    /// Gateway configuration (env-derived).
    pub config: Arc<Config>,
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(config: Config, gateway: Gateway) -> Self {
        Self { config: Arc::new(config), gateway: Arc::new(gateway) }
    }

    /// Wire the object store, purger, and fetcher described by `config`.
    pub fn from_config(config: Config) -> Result<Self, GatewayError> {
        let (store, backend) = build_object_store(&config)?;

        let purger: Arc<dyn CachePurger> = match config.cdn_credentials() {
            Some((zone, token)) => {
                info!(zone = %zone, "CDN cache purge enabled");
                let purger =
                    CloudflarePurger::new(zone, token, Duration::from_secs(config.purge_timeout_secs))
                        .map_err(|e| GatewayError::Config(format!("purge client: {e}")))?;
                Arc::new(purger)
            }
            None => {
                info!("CDN credentials not set; cache purge disabled");
                Arc::new(DisabledPurger)
            }
        };

        let fetcher = Fetcher::builder()
            .set_timeout(Duration::from_secs(config.fetch_timeout_secs))
            .set_max_bytes(config.max_upload_bytes())
            .build()
            .map_err(|e| GatewayError::Config(format!("fetch client: {e}")))?;

        let ingress_root = &config.local_ingress_root;
        std::fs::create_dir_all(ingress_root).map_err(|e| {
            GatewayError::Config(format!(
                "failed to create ingress directory '{}': {e}",
                ingress_root.display()
            ))
        })?;
        let local_ingress_root = ingress_root.canonicalize().map_err(|e| {
            GatewayError::Config(format!("failed to resolve '{}': {e}", ingress_root.display()))
        })?;
        info!(root = %local_ingress_root.display(), "local-path ingress confined");

        let gateway = Gateway::new(
            store,
            backend,
            purger,
            fetcher,
            GatewaySettings {
                public_base_url: config.public_base_url.clone(),
                key_prefix: config.key_prefix.clone(),
                max_upload_bytes: config.max_upload_bytes(),
                local_ingress_root,
            },
        );
        Ok(Self::new(config, gateway))
    }
}
