use restora_fetch::FetchError;
use restora_types::{ErrorKind, JobFailure, JobId, JobStatus};
use thiserror::Error;

/// Errors produced by the orchestrator, its pipeline, and the upload delegate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {id} is not finished (status: {status})")]
    NotReady { id: JobId, status: JobStatus },

    #[error("source fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("storage gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("upload timed out after {secs}s")]
    UploadTimeout { secs: u64 },

    #[error("upload rejected: {0}")]
    UploadRejected(String),

    #[error("storage write failed: {0}")]
    StorageWrite(String),

    /// The job was deleted while its pipeline was running.
    #[error("job cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::NotReady { .. } => ErrorKind::NotReady,
            CoreError::Fetch(_) => ErrorKind::Fetch,
            CoreError::Transform(_) => ErrorKind::Transform,
            CoreError::GatewayUnavailable(_) => ErrorKind::GatewayUnavailable,
            CoreError::UploadTimeout { .. } => ErrorKind::UploadTimeout,
            CoreError::UploadRejected(_) => ErrorKind::UploadRejected,
            CoreError::StorageWrite(_) => ErrorKind::StorageWrite,
            CoreError::Cancelled | CoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Classified failure to record on a job.
    pub fn to_failure(&self) -> JobFailure {
        let detail = match self {
            CoreError::Fetch(e) => e.to_string(),
            CoreError::Transform(m)
            | CoreError::GatewayUnavailable(m)
            | CoreError::UploadRejected(m)
            | CoreError::StorageWrite(m)
            | CoreError::Internal(m) => m.clone(),
            other => other.to_string(),
        };
        JobFailure::new(self.kind(), detail)
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Internal(format!("I/O error: {e}"))
    }
}
