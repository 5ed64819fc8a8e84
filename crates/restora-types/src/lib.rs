//! Shared data model for the restora processing service and storage gateway.
//!
//! Both services exchange these types over HTTP, so every wire type derives
//! `Serialize`/`Deserialize` and a `utoipa` schema.

pub mod error;
pub mod job;
pub mod key;
pub mod options;
pub mod upload;

pub use error::{ErrorBody, ErrorKind, JobFailure};
pub use job::{Job, JobId, JobRequest, JobResult, JobStage, JobState, JobStatus};
pub use key::{derive_object_key, filename_from_url, validate_object_key, DEFAULT_FILENAME};
pub use options::{
    BgUpsampler, ColorizeOptions, DetectionModel, EnhanceOptions, InpaintOptions, Operation,
    TransformOptions,
};
pub use upload::{
    DeleteObjectRequest, DeleteObjectResponse, LocalUploadRequest, UploadResponse,
    UrlUploadRequest,
};
