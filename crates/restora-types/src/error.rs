use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Classification shared by every failure a caller or a job record can see.
///
/// The delegation-path kinds (`Fetch`, `GatewayUnavailable`, `UploadTimeout`,
/// `UploadRejected`) are kept distinct so a failed job reports exactly which
/// hop broke.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
    strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Bad caller input; never retried.
    Validation,
    /// Unknown job id, missing local artifact, or missing object.
    NotFound,
    /// Result requested before the job reached a terminal state.
    NotReady,
    /// A remote source could not be fetched (non-2xx, timeout, I/O).
    Fetch,
    /// The artifact transform failed or produced no output.
    Transform,
    /// The storage gateway could not be reached.
    GatewayUnavailable,
    /// The storage gateway did not answer within the upload bound.
    UploadTimeout,
    /// The storage gateway refused the upload request.
    UploadRejected,
    /// The durable object store rejected the write.
    StorageWrite,
    /// Anything else, including a panicked job task.
    Internal,
}

/// Failure recorded on a job once it reaches `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl JobFailure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Body of every non-2xx response from either service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds_serialize_as_snake_case() {
        let v = serde_json::to_value(ErrorKind::GatewayUnavailable).unwrap();
        assert_eq!(v, "gateway_unavailable");
        assert_eq!(ErrorKind::UploadTimeout.to_string(), "upload_timeout");
    }

    #[test]
    fn failure_display_includes_kind() {
        let f = JobFailure::new(ErrorKind::UploadRejected, "file missing");
        assert_eq!(f.to_string(), "upload_rejected: file missing");
    }
}
