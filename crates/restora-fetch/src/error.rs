use thiserror::Error;

/// Errors returned while fetching a remote source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL did not parse or is not http(s).
    #[error("invalid source URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The remote answered with a non-2xx status.
    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The request did not finish within the configured bound.
    #[error("fetching {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The body exceeded the configured size limit.
    #[error("source {url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },

    /// Connection-level failure (DNS, refused, reset, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the downloaded body to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}
