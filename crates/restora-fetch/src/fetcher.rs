use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::FetchError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// A fetched source whose body has not been read yet.
pub struct RemoteSource {
    pub url: String,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    response: reqwest::Response,
    timeout_secs: u64,
    max_bytes: Option<u64>,
}

impl RemoteSource {
    /// Stream the body chunk by chunk, enforcing the size limit.
    pub fn into_stream(
        self,
    ) -> impl futures::Stream<Item = Result<Bytes, FetchError>> + Send + 'static {
        let url = self.url;
        let secs = self.timeout_secs;
        let limit = self.max_bytes;
        let mut seen: u64 = 0;
        self.response.bytes_stream().map(move |chunk| {
            let chunk = chunk.map_err(|e| classify(&url, secs, e))?;
            seen += chunk.len() as u64;
            match limit {
                Some(limit) if seen > limit => Err(FetchError::TooLarge { url: url.clone(), limit }),
                _ => Ok(chunk),
            }
        })
    }

    /// Buffer the whole body.
    pub async fn bytes(self) -> Result<Bytes, FetchError> {
        let mut stream = Box::pin(self.into_stream());
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }
}

/// HTTP client for pulling remote sources with an explicit time bound.
///
/// The bound covers connect, headers, and body, so no fetch can hang.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    max_bytes: Option<u64>,
}

/// Builder for [`Fetcher`].
#[derive(Debug, Clone)]
pub struct FetcherBuilder {
    timeout: Duration,
    max_bytes: Option<u64>,
    proxy: Option<String>,
}

impl Default for FetcherBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_bytes: None,
            proxy: std::env::var("HTTPS_PROXY").ok().or_else(|| std::env::var("HTTP_PROXY").ok()),
        }
    }
}

impl FetcherBuilder {
    /// Total per-request bound (default: 30s).
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reject bodies larger than `max_bytes`.
    pub fn set_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Override the proxy picked up from `HTTPS_PROXY` / `HTTP_PROXY`.
    pub fn set_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Fails only when the TLS backend cannot be initialised.
    pub fn build(self) -> Result<Fetcher, FetchError> {
        let mut builder = Client::builder()
            .user_agent(concat!("restora-fetch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(self.timeout.min(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)))
            .timeout(self.timeout);

        if let Some(ref proxy_url) = self.proxy {
            match reqwest::Proxy::all(proxy_url) {
                Ok(p) => builder = builder.proxy(p),
                Err(e) => warn!(proxy = %proxy_url, error = %e, "ignoring invalid proxy URL"),
            }
        }

        let client = builder.build()?;
        Ok(Fetcher { client, timeout: self.timeout, max_bytes: self.max_bytes })
    }
}

impl Fetcher {
    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send the GET and check the status; the body is left unread.
    pub async fn open(&self, raw_url: &str) -> Result<RemoteSource, FetchError> {
        let url = parse_http_url(raw_url)?;
        let secs = self.timeout.as_secs();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify(raw_url, secs, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: raw_url.to_owned(), status: status.as_u16() });
        }

        let content_length = response.content_length();
        if let (Some(limit), Some(len)) = (self.max_bytes, content_length) {
            if len > limit {
                return Err(FetchError::TooLarge { url: raw_url.to_owned(), limit });
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        debug!(url = %raw_url, status = status.as_u16(), ?content_length, "source opened");

        Ok(RemoteSource {
            url: raw_url.to_owned(),
            content_type,
            content_length,
            response,
            timeout_secs: secs,
            max_bytes: self.max_bytes,
        })
    }

    /// Download `raw_url` into `dest`, returning the number of bytes written.
    ///
    /// A partially written file is removed on failure.
    pub async fn download_to(&self, raw_url: &str, dest: &Path) -> Result<u64, FetchError> {
        let source = self.open(raw_url).await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let result = async {
            let mut file = tokio::fs::File::create(dest).await?;
            let mut stream = Box::pin(source.into_stream());
            let mut written: u64 = 0;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<u64, FetchError>(written)
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }
}

fn parse_http_url(raw: &str) -> Result<url::Url, FetchError> {
    let url = url::Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_owned(),
        message: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl {
            url: raw.to_owned(),
            message: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn classify(url: &str, secs: u64, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.to_owned(), secs }
    } else {
        FetchError::Http(e)
    }
}
