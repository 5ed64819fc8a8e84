//! Job orchestration for the restora processing service.
//!
//! A submitted [`JobRequest`](restora_types::JobRequest) is recorded in the
//! [`JobStore`] as `queued` and handed to a background task that downloads the
//! source image, runs an [`ArtifactTransform`], and delegates the upload of
//! the result to the storage gateway through an [`UploadDelegate`].

pub mod delegate;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod store;
pub mod transform;

pub use delegate::{HttpUploadDelegate, UploadDelegate, LOCAL_UPLOAD_PATH};
pub use error::CoreError;
pub use orchestrator::{JobOutcome, Orchestrator};
pub use pipeline::{Pipeline, PipelineConfig};
pub use store::{JobStore, Transition};
pub use transform::ArtifactTransform;
