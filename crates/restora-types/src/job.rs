//! Job record and its lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::JobFailure;
use crate::options::{Operation, TransformOptions};

/// Opaque job handle (a UUID v4 rendered as a string).
pub type JobId = String;

/// Validated input of a job. Immutable once the job exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobRequest {
    /// Owner identifier; namespaces the storage key.
    pub user_id: String,
    /// http(s) URL of the source image.
    pub image_url: String,
    pub options: TransformOptions,
}

impl JobRequest {
    pub fn operation(&self) -> Operation {
        self.options.operation()
    }
}

/// External status vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
    strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Pipeline stage a `processing` job is currently in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
    strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStage {
    Downloading,
    Transforming,
    Uploading,
}

/// Payload of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobResult {
    pub public_url: String,
    pub storage_key: String,
    pub file_size: u64,
    pub content_type: String,
    /// Wall-clock time from pick-up to completion.
    pub processing_time_ms: u64,
}

/// Internal lifecycle state. Result and failure live inside the terminal
/// variants, so they can never coexist or appear early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Processing { stage: JobStage },
    Completed(JobResult),
    Failed(JobFailure),
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Queued => JobStatus::Queued,
            JobState::Processing { .. } => JobStatus::Processing,
            JobState::Completed(_) => JobStatus::Completed,
            JobState::Failed(_) => JobStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Whether moving from `self` to `next` is an allowed edge of the
    /// `queued -> processing -> {completed, failed}` machine.
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        match (self, next) {
            (JobState::Queued, JobState::Processing { .. }) => true,
            (JobState::Queued, JobState::Failed(_)) => true,
            (JobState::Processing { .. }, JobState::Processing { .. }) => true,
            (JobState::Processing { .. }, JobState::Completed(_)) => true,
            (JobState::Processing { .. }, JobState::Failed(_)) => true,
            _ => false,
        }
    }
}

/// A tracked unit of asynchronous work.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub request: JobRequest,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, request: JobRequest) -> Self {
        let now = Utc::now();
        Self { id, request, state: JobState::Queued, created_at: now, updated_at: now }
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    pub fn stage(&self) -> Option<JobStage> {
        match &self.state {
            JobState::Processing { stage } => Some(*stage),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&JobResult> {
        match &self.state {
            JobState::Completed(r) => Some(r),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match &self.state {
            JobState::Failed(f) => Some(f),
            _ => None,
        }
    }
}
