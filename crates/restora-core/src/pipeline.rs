//! Per-job background pipeline: download -> transform -> delegate upload.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use restora_fetch::Fetcher;
use restora_types::{
    derive_object_key, filename_from_url, JobRequest, JobResult, JobStage, JobState,
    DEFAULT_FILENAME,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::delegate::UploadDelegate;
use crate::error::CoreError;
use crate::store::{JobStore, Transition};
use crate::transform::ArtifactTransform;

/// Filesystem and naming settings for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root under which each job gets `<work_dir>/<job_id>/`. Must be on a
    /// volume the storage gateway can read.
    pub work_dir: PathBuf,
    /// First segment of every storage key, e.g. `uploads`.
    pub key_prefix: String,
}

/// Collaborators one job run needs.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Fetcher,
    transform: Arc<dyn ArtifactTransform>,
    delegate: Arc<dyn UploadDelegate>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("config", &self.config).finish()
    }
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        fetcher: Fetcher,
        transform: Arc<dyn ArtifactTransform>,
        delegate: Arc<dyn UploadDelegate>,
    ) -> Self {
        Self { config, fetcher, transform, delegate }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.config.work_dir.join(job_id)
    }

    /// Best-effort removal of a job's temporary artifacts.
    pub async fn cleanup(&self, job_id: &str) {
        let dir = self.job_dir(job_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!(job_id = %job_id, dir = %dir.display(), "removed job artifacts"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(job_id = %job_id, dir = %dir.display(), error = %e, "failed to remove job artifacts"),
        }
    }

    /// Run every stage for one job and build its result.
    ///
    /// Returns [`CoreError::Cancelled`] as soon as the job is deleted.
    pub(crate) async fn run(
        &self,
        job_id: &str,
        request: &JobRequest,
        store: &JobStore,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<JobResult, CoreError> {
        let started = Instant::now();
        let filename = filename_from_url(&request.image_url)
            .unwrap_or_else(|| DEFAULT_FILENAME.to_owned());
        let job_dir = self.job_dir(job_id);
        let input = job_dir.join("input").join(&filename);

        self.stage(job_id, JobStage::Downloading, store, cancel, async {
            let bytes = self.fetcher.download_to(&request.image_url, &input).await?;
            debug!(job_id = %job_id, bytes, "source downloaded");
            Ok::<(), CoreError>(())
        })
        .await?;

        let artifact = self
            .stage(job_id, JobStage::Transforming, store, cancel, async {
                let produced = self
                    .transform
                    .transform(&input, &job_dir.join("output"), &request.options)
                    .await?;
                place_artifact(&produced, &job_dir.join("result"), &filename).await
            })
            .await?;

        let key = derive_object_key(&self.config.key_prefix, &request.user_id, &filename);
        let upload = self
            .stage(job_id, JobStage::Uploading, store, cancel, async {
                self.delegate.upload(&artifact, &key).await
            })
            .await?;

        Ok(JobResult {
            public_url: upload.public_url,
            storage_key: upload.storage_key,
            file_size: upload.file_size,
            content_type: upload.content_type,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Enter `stage`, then race `work` against the job's cancel signal.
    async fn stage<T>(
        &self,
        job_id: &str,
        stage: JobStage,
        store: &JobStore,
        cancel: &mut watch::Receiver<bool>,
        work: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        if *cancel.borrow() {
            return Err(CoreError::Cancelled);
        }
        match store.transition(job_id, JobState::Processing { stage }).await {
            Transition::Applied => {}
            Transition::Missing => return Err(CoreError::Cancelled),
            Transition::Rejected => {
                return Err(CoreError::Internal(format!("job {job_id} cannot enter stage {stage}")));
            }
        }

        let started = Instant::now();
        let outcome = tokio::select! {
            r = work => r,
            _ = cancelled(cancel) => Err(CoreError::Cancelled),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => info!(job_id = %job_id, stage = %stage, elapsed_ms, "stage finished"),
            Err(e) => warn!(job_id = %job_id, stage = %stage, elapsed_ms, error = %e, "stage failed"),
        }
        outcome
    }
}

/// Resolves once the cancel flag is `true`; never resolves otherwise.
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone without a cancel: nothing will ever flip the flag.
            std::future::pending::<()>().await;
        }
    }
}

/// Move the transform's output to `<dir>/<filename>` so the upload carries
/// the source's name.
async fn place_artifact(produced: &Path, dir: &Path, filename: &str) -> Result<PathBuf, CoreError> {
    if !tokio::fs::try_exists(produced).await.unwrap_or(false) {
        return Err(CoreError::Transform(format!(
            "output file {} not found",
            produced.display()
        )));
    }
    tokio::fs::create_dir_all(dir).await?;
    let dest = dir.join(filename);
    if tokio::fs::rename(produced, &dest).await.is_err() {
        // Cross-device: fall back to copy.
        tokio::fs::copy(produced, &dest).await?;
    }
    Ok(dest)
}
