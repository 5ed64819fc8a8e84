//! Request and response bodies of the job API.

use chrono::{DateTime, Utc};
use restora_core::JobOutcome;
use restora_types::{
    ColorizeOptions, EnhanceOptions, InpaintOptions, Job, JobFailure, JobId, JobRequest, JobStage,
    JobStatus, Operation, TransformOptions,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnhanceRequest {
    pub user_id: String,
    pub image_url: String,
    #[serde(flatten)]
    pub options: EnhanceOptions,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ColorizeRequest {
    pub user_id: String,
    pub image_url: String,
    #[serde(flatten)]
    pub options: ColorizeOptions,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InpaintRequest {
    pub user_id: String,
    pub image_url: String,
    #[serde(flatten)]
    pub options: InpaintOptions,
}

impl From<EnhanceRequest> for JobRequest {
    fn from(r: EnhanceRequest) -> Self {
        JobRequest { user_id: r.user_id, image_url: r.image_url, options: TransformOptions::Enhance(r.options) }
    }
}

impl From<ColorizeRequest> for JobRequest {
    fn from(r: ColorizeRequest) -> Self {
        JobRequest { user_id: r.user_id, image_url: r.image_url, options: TransformOptions::Colorize(r.options) }
    }
}

impl From<InpaintRequest> for JobRequest {
    fn from(r: InpaintRequest) -> Self {
        JobRequest { user_id: r.user_id, image_url: r.image_url, options: TransformOptions::Inpaint(r.options) }
    }
}

/// `202 Accepted` body of a submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobAccepted {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Status view of one job.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobView {
    pub job_id: JobId,
    pub operation: Operation,
    pub user_id: String,
    pub status: JobStatus,
    /// Current stage while `processing`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            operation: job.request.operation(),
            user_id: job.request.user_id.clone(),
            status: job.status(),
            progress: job.stage(),
            error: job.failure().cloned(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// Terminal outcome. Completed jobs carry the published object; failed jobs
/// carry their classified error.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobResultView {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    /// Seconds from pick-up to completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
}

impl From<JobOutcome> for JobResultView {
    fn from(outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed(r) => Self {
                status: JobStatus::Completed,
                public_url: Some(r.public_url),
                storage_key: Some(r.storage_key),
                processing_time: Some(r.processing_time_ms as f64 / 1000.0),
                file_size: Some(r.file_size),
                content_type: Some(r.content_type),
                error: None,
            },
            JobOutcome::Failed(f) => Self {
                status: JobStatus::Failed,
                public_url: None,
                storage_key: None,
                processing_time: None,
                file_size: None,
                content_type: None,
                error: Some(f),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobDeleted {
    pub job_id: JobId,
    pub deleted: bool,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct JobListQuery {
    /// Only jobs owned by this user.
    pub owner: Option<String>,
}
