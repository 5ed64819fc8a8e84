//! Upload delegation to the storage gateway's local-path ingress.
//!
//! The gateway opens the artifact from its own filesystem, so this path only
//! works when both services see the same volume.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use restora_types::{ErrorBody, LocalUploadRequest, UploadResponse};
use tracing::debug;

use crate::error::CoreError;

/// Route of the gateway's local-path ingress.
pub const LOCAL_UPLOAD_PATH: &str = "/upload/local";

/// Hands a local artifact to the storage gateway.
///
/// Implementations are stateless and safe to call from many jobs at once.
#[async_trait]
pub trait UploadDelegate: Send + Sync + 'static {
    async fn upload(&self, artifact: &Path, key: &str) -> Result<UploadResponse, CoreError>;
}

/// [`UploadDelegate`] backed by the gateway's HTTP surface.
#[derive(Debug, Clone)]
pub struct HttpUploadDelegate {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpUploadDelegate {
    /// `gateway_url` is the gateway's base address, e.g. `http://127.0.0.1:8106`.
    pub fn new(gateway_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("restora-core/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", gateway_url.trim_end_matches('/'), LOCAL_UPLOAD_PATH),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify_send_error(&self, e: reqwest::Error) -> CoreError {
        if e.is_timeout() {
            CoreError::UploadTimeout { secs: self.timeout.as_secs() }
        } else {
            CoreError::GatewayUnavailable(e.to_string())
        }
    }
}

#[async_trait]
impl UploadDelegate for HttpUploadDelegate {
    async fn upload(&self, artifact: &Path, key: &str) -> Result<UploadResponse, CoreError> {
        let body = LocalUploadRequest {
            path: artifact.to_string_lossy().into_owned(),
            key: key.to_owned(),
        };
        debug!(endpoint = %self.endpoint, key = %key, path = %body.path, "delegating upload");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            let upload: UploadResponse = response
                .json()
                .await
                .map_err(|e| self.classify_send_error(e))?;
            if !upload.success {
                return Err(CoreError::UploadRejected(format!(
                    "gateway reported failure for {key}"
                )));
            }
            return Ok(upload);
        }

        let detail = error_detail(response).await;
        Err(classify_status(status, detail, self.timeout.as_secs()))
    }
}

/// Pull the gateway's `{"error": ...}` detail, falling back to the raw body.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error,
        Err(_) if !text.trim().is_empty() => text,
        Err(_) => format!("gateway returned HTTP {}", status.as_u16()),
    }
}

fn classify_status(status: StatusCode, detail: String, timeout_secs: u64) -> CoreError {
    match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            CoreError::GatewayUnavailable(detail)
        }
        StatusCode::GATEWAY_TIMEOUT => CoreError::UploadTimeout { secs: timeout_secs },
        s if s.is_client_error() => CoreError::UploadRejected(detail),
        _ => CoreError::StorageWrite(detail),
    }
}
