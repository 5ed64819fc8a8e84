use std::sync::Arc;

use restora_types::{Job, JobFailure, JobId, JobRequest, JobResult, JobState};
use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};

use crate::error::CoreError;
use crate::pipeline::{cancelled, Pipeline};
use crate::store::{JobStore, Transition};

/// Terminal payload returned by [`Orchestrator::result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(JobResult),
    Failed(JobFailure),
}

/// Accepts jobs, runs each one in its own background task, and answers
/// status, result, and delete requests against the shared [`JobStore`].
///
/// At most `max_concurrent_jobs` pipelines run at once; the rest stay
/// `queued` until a permit frees up.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    store: JobStore,
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(pipeline: Pipeline, max_concurrent_jobs: usize) -> Self {
        Self {
            store: JobStore::new(),
            pipeline: Arc::new(pipeline),
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Validate, record as `queued`, schedule, and return the new id without
    /// waiting for any pipeline work.
    /// Validate and enqueue a job. `user_id` is stored trimmed, so the key
    /// derived from it matches what validation accepted.
    pub async fn submit(&self, mut request: JobRequest) -> Result<JobId, CoreError> {
        request.user_id = request.user_id.trim().to_owned();
        validate(&request)?;

        let (id, cancel) = self.store.create(request.clone()).await;
        info!(
            job_id = %id,
            operation = %request.operation(),
            user_id = %request.user_id,
            "job queued"
        );

        tokio::spawn(execute(
            id.clone(),
            request,
            self.store.clone(),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.permits),
            cancel,
        ));
        Ok(id)
    }

    pub async fn status(&self, id: &str) -> Result<Job, CoreError> {
        self.store.get(id).await.ok_or_else(|| CoreError::NotFound(id.to_owned()))
    }

    /// Terminal outcome of a job; `NotReady` while it is queued or processing.
    pub async fn result(&self, id: &str) -> Result<JobOutcome, CoreError> {
        let job = self.status(id).await?;
        match job.state {
            JobState::Completed(result) => Ok(JobOutcome::Completed(result)),
            JobState::Failed(failure) => Ok(JobOutcome::Failed(failure)),
            other => Err(CoreError::NotReady { id: job.id, status: other.status() }),
        }
    }

    /// Remove a job. An in-flight pipeline is signalled to stop and its
    /// outcome, if any, is discarded.
    pub async fn delete(&self, id: &str) -> Result<Job, CoreError> {
        let job = self
            .store
            .remove(id)
            .await
            .ok_or_else(|| CoreError::NotFound(id.to_owned()))?;
        self.pipeline.cleanup(id).await;
        info!(job_id = %id, status = %job.status(), "job deleted");
        Ok(job)
    }

    pub async fn list(&self, owner: Option<&str>) -> Vec<Job> {
        self.store.list(owner).await
    }
}

fn validate(request: &JobRequest) -> Result<(), CoreError> {
    let owner = request.user_id.trim();
    if owner.is_empty() {
        return Err(CoreError::Validation("user_id must not be empty".into()));
    }
    if owner.contains('/') || owner == "." || owner == ".." {
        return Err(CoreError::Validation(format!(
            "user_id '{owner}' must be a single path segment"
        )));
    }
    if request.image_url.trim().is_empty() {
        return Err(CoreError::Validation("image_url must not be empty".into()));
    }
    let url = url::Url::parse(&request.image_url)
        .map_err(|e| CoreError::Validation(format!("image_url is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CoreError::Validation(format!(
            "image_url must be http or https, got '{}'",
            url.scheme()
        )));
    }
    request.options.validate().map_err(CoreError::Validation)
}

/// Background body of one job: wait for a worker slot, run the pipeline in a
/// child task so a panic is contained, then write back the terminal state.
async fn execute(
    id: JobId,
    request: JobRequest,
    store: JobStore,
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
    mut cancel: watch::Receiver<bool>,
) {
    let permit = tokio::select! {
        p = Arc::clone(&permits).acquire_owned() => p,
        _ = cancelled(&mut cancel) => {
            info!(job_id = %id, "job deleted before it started");
            return;
        }
    };
    let _permit = match permit {
        Ok(p) => p,
        Err(e) => {
            let failure = JobFailure::new(restora_types::ErrorKind::Internal, e.to_string());
            store.transition(&id, JobState::Failed(failure)).await;
            return;
        }
    };

    let worker = {
        let id = id.clone();
        let store = store.clone();
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.run(&id, &request, &store, &mut cancel).await })
    };

    let outcome = match worker.await {
        Ok(r) => r,
        Err(e) if e.is_panic() => {
            error!(job_id = %id, "job task panicked");
            Err(CoreError::Internal("job task panicked".into()))
        }
        Err(e) => Err(CoreError::Internal(e.to_string())),
    };

    let next = match outcome {
        Ok(result) => {
            info!(
                job_id = %id,
                storage_key = %result.storage_key,
                processing_time_ms = result.processing_time_ms,
                "job completed"
            );
            Some(JobState::Completed(result))
        }
        Err(CoreError::Cancelled) => None,
        Err(e) => {
            warn!(job_id = %id, kind = %e.kind(), error = %e, "job failed");
            Some(JobState::Failed(e.to_failure()))
        }
    };

    if let Some(next) = next {
        if store.transition(&id, next).await == Transition::Missing {
            info!(job_id = %id, "job deleted while in flight; outcome discarded");
        }
    } else {
        info!(job_id = %id, "job cancelled");
    }

    pipeline.cleanup(&id).await;
}

#[cfg(test)]
mod test {
    use super::*;
    use restora_types::{EnhanceOptions, InpaintOptions, TransformOptions};

    fn request(user_id: &str, image_url: &str, options: TransformOptions) -> JobRequest {
        JobRequest { user_id: user_id.into(), image_url: image_url.into(), options }
    }

    fn enhance() -> TransformOptions {
        TransformOptions::Enhance(EnhanceOptions::default())
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(validate(&request("42", "http://x/a.jpg", enhance())).is_ok());
    }

    #[test]
    fn rejects_missing_fields() {
        for (user, url) in [("", "http://x/a.jpg"), ("  ", "http://x/a.jpg"), ("42", "")] {
            let err = validate(&request(user, url, enhance())).unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "{user:?} {url:?}");
        }
    }

    #[test]
    fn rejects_owner_that_escapes_the_namespace() {
        assert!(validate(&request("../42", "http://x/a.jpg", enhance())).is_err());
        assert!(validate(&request("a/b", "http://x/a.jpg", enhance())).is_err());
    }

    #[test]
    fn rejects_non_http_sources() {
        assert!(validate(&request("42", "ftp://x/a.jpg", enhance())).is_err());
        assert!(validate(&request("42", "a.jpg", enhance())).is_err());
    }

    #[test]
    fn rejects_out_of_bounds_weight() {
        let opts = TransformOptions::Inpaint(InpaintOptions { fidelity_weight: -0.1, upscale: 2 });
        let err = validate(&request("42", "http://x/a.jpg", opts)).unwrap_err();
        assert!(err.to_string().contains("fidelity_weight"));
    }
}
