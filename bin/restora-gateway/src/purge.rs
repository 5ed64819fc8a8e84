//! CDN cache invalidation.
//!
//! A purge runs after every successful write. It is best-effort: a failure is
//! logged by the caller and never changes the upload's reported outcome.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

const CLOUDFLARE_API: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("purge request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("purge rejected with HTTP {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

#[async_trait]
pub trait CachePurger: Send + Sync + 'static {
    /// Whether purges are actually sent anywhere.
    fn enabled(&self) -> bool {
        true
    }

    async fn purge(&self, public_url: &str) -> Result<(), PurgeError>;
}

/// Used when no CDN credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPurger;

#[async_trait]
impl CachePurger for DisabledPurger {
    fn enabled(&self) -> bool {
        false
    }

    async fn purge(&self, _public_url: &str) -> Result<(), PurgeError> {
        Ok(())
    }
}

/// Purges single files through the Cloudflare zone `purge_cache` API.
#[derive(Debug, Clone)]
pub struct CloudflarePurger {
    client: Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PurgeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

impl CloudflarePurger {
    pub fn new(zone_id: &str, api_token: &str, timeout: Duration) -> Result<Self, PurgeError> {
        Self::with_api_base(CLOUDFLARE_API, zone_id, api_token, timeout)
    }

    /// Point the purger at another API root (used against local stubs).
    pub fn with_api_base(
        api_base: &str,
        zone_id: &str,
        api_token: &str,
        timeout: Duration,
    ) -> Result<Self, PurgeError> {
        let client = Client::builder()
            .user_agent(concat!("restora-gateway/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/zones/{zone_id}/purge_cache", api_base.trim_end_matches('/')),
            token: api_token.to_owned(),
        })
    }
}

#[async_trait]
impl CachePurger for CloudflarePurger {
    async fn purge(&self, public_url: &str) -> Result<(), PurgeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "files": [public_url] }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let parsed: Option<PurgeResponse> = serde_json::from_str(&text).ok();
        match parsed {
            Some(body) if status.is_success() && body.success => {
                debug!(url = %public_url, "cache purged");
                Ok(())
            }
            Some(body) => Err(PurgeError::Rejected {
                status: status.as_u16(),
                detail: serde_json::to_string(&body.errors).unwrap_or_default(),
            }),
            None => Err(PurgeError::Rejected { status: status.as_u16(), detail: text }),
        }
    }
}
