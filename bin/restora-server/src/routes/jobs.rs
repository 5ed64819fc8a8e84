//! Job submission, status, result, and delete endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use restora_types::{ErrorBody, JobFailure, JobRequest, JobStage, JobStatus, Operation};
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::{
    ColorizeRequest, EnhanceRequest, InpaintRequest, JobAccepted, JobDeleted, JobListQuery,
    JobResultView, JobView,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(enhance, colorize, inpaint, list_jobs, get_job, get_job_result, delete_job),
    components(schemas(
        EnhanceRequest, ColorizeRequest, InpaintRequest, JobAccepted, JobView, JobResultView,
        JobDeleted, JobStatus, JobStage, JobFailure, Operation, ErrorBody
    ))
)]
pub struct JobsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/enhance", post(enhance))
        .route("/colorize", post(colorize))
        .route("/inpaint", post(inpaint))
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job).delete(delete_job))
        .route("/jobs/{id}/result", get(get_job_result))
}

async fn submit(
    state: &AppState,
    request: JobRequest,
) -> Result<(StatusCode, Json<JobAccepted>), ServerError> {
    let operation = request.operation();
    let job_id = state.orchestrator.submit(request).await?;
    info!(job_id = %job_id, %operation, "job accepted");
    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id, status: JobStatus::Queued })))
}

/// Queue a face restoration job.
#[utoipa::path(
    post,
    path = "/enhance",
    tag = "jobs",
    request_body = EnhanceRequest,
    responses(
        (status = 202, description = "Job queued", body = JobAccepted),
        (status = 400, description = "Invalid request", body = ErrorBody),
    )
)]
pub async fn enhance(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EnhanceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobAccepted>), ServerError> {
    let Json(req) = payload?;
    submit(&state, req.into()).await
}

#[utoipa::path(
    post,
    path = "/colorize",
    tag = "jobs",
    request_body = ColorizeRequest,
    responses(
        (status = 202, description = "Job queued", body = JobAccepted),
        (status = 400, description = "Invalid request", body = ErrorBody),
    )
)]
pub async fn colorize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ColorizeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobAccepted>), ServerError> {
    let Json(req) = payload?;
    submit(&state, req.into()).await
}

#[utoipa::path(
    post,
    path = "/inpaint",
    tag = "jobs",
    request_body = InpaintRequest,
    responses(
        (status = 202, description = "Job queued", body = JobAccepted),
        (status = 400, description = "Invalid request", body = ErrorBody),
    )
)]
pub async fn inpaint(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InpaintRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobAccepted>), ServerError> {
    let Json(req) = payload?;
    submit(&state, req.into()).await
}

/// Jobs newest first, optionally only one owner's.
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    params(JobListQuery),
    responses((status = 200, description = "Job list", body = [JobView]))
)]
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobListQuery>,
) -> Json<Vec<JobView>> {
    let jobs = state.orchestrator.list(query.owner.as_deref()).await;
    Json(jobs.iter().map(JobView::from).collect())
}

#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job status", body = JobView),
        (status = 404, description = "Unknown or deleted job", body = ErrorBody),
    )
)]
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobView>, ServerError> {
    let job = state.orchestrator.status(&id).await?;
    Ok(Json(JobView::from(&job)))
}

/// Terminal outcome. A failed job answers 200 with its error.
#[utoipa::path(
    get,
    path = "/jobs/{id}/result",
    tag = "jobs",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Completed or failed", body = JobResultView),
        (status = 404, description = "Unknown or deleted job", body = ErrorBody),
        (status = 409, description = "Still queued or processing", body = ErrorBody),
    )
)]
pub async fn get_job_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobResultView>, ServerError> {
    let outcome = state.orchestrator.result(&id).await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    tag = "jobs",
    params(("id" = String, Path, description = "Job id")),
    responses(
        (status = 200, description = "Deleted", body = JobDeleted),
        (status = 404, description = "Unknown or already deleted job", body = ErrorBody),
    )
)]
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobDeleted>, ServerError> {
    let job = state.orchestrator.delete(&id).await?;
    Ok(Json(JobDeleted { job_id: job.id, deleted: true }))
}
