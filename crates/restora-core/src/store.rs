use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use restora_types::{Job, JobId, JobRequest, JobState};
use tokio::sync::{watch, RwLock};
use tracing::warn;

/// In-memory record for one job plus the sender half of its cancel signal.
#[derive(Debug)]
struct JobEntry {
    job: Job,
    cancel_tx: watch::Sender<bool>,
}

/// Outcome of [`JobStore::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The record was deleted; the write was dropped.
    Missing,
    /// The edge is not part of the state machine; the write was dropped.
    Rejected,
}

/// Shared job registry.
///
/// A single `tokio::sync::RwLock<HashMap>` guards every record, so status
/// polls run concurrently and each state change (status, result, error,
/// `updated_at`) lands as one write.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    inner: Arc<RwLock<HashMap<JobId, JobEntry>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id and insert a `queued` record.
    ///
    /// Returns the id and a receiver that flips to `true` when the job is
    /// deleted.
    pub async fn create(&self, request: JobRequest) -> (JobId, watch::Receiver<bool>) {
        let id = uuid::Uuid::new_v4().to_string();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let entry = JobEntry { job: Job::new(id.clone(), request), cancel_tx };
        self.inner.write().await.insert(id.clone(), entry);
        (id, cancel_rx)
    }

    /// Snapshot of a job.
    pub async fn get(&self, id: &str) -> Option<Job> {
        self.inner.read().await.get(id).map(|e| e.job.clone())
    }

    /// Move a job to `next` if the state machine allows it.
    pub async fn transition(&self, id: &str, next: JobState) -> Transition {
        let mut guard = self.inner.write().await;
        let Some(entry) = guard.get_mut(id) else {
            return Transition::Missing;
        };
        if !entry.job.state.can_transition_to(&next) {
            warn!(
                job_id = %id,
                from = %entry.job.status(),
                to = %next.status(),
                "rejected illegal job transition"
            );
            return Transition::Rejected;
        }
        entry.job.state = next;
        entry.job.updated_at = Utc::now();
        Transition::Applied
    }

    /// Remove a job and signal its pipeline to stop.
    pub async fn remove(&self, id: &str) -> Option<Job> {
        let entry = self.inner.write().await.remove(id)?;
        entry.cancel_tx.send_replace(true);
        Some(entry.job)
    }

    /// All jobs, newest first, optionally restricted to one owner.
    pub async fn list(&self, owner: Option<&str>) -> Vec<Job> {
        let guard = self.inner.read().await;
        let mut jobs: Vec<Job> = guard
            .values()
            .filter(|e| owner.is_none_or(|o| e.job.request.user_id == o))
            .map(|e| e.job.clone())
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use restora_types::{
        ColorizeOptions, ErrorKind, JobFailure, JobResult, JobStage, JobStatus, TransformOptions,
    };

    fn request(owner: &str) -> JobRequest {
        JobRequest {
            user_id: owner.into(),
            image_url: "http://x/a.jpg".into(),
            options: TransformOptions::Colorize(ColorizeOptions::default()),
        }
    }

    fn completed() -> JobState {
        JobState::Completed(JobResult {
            public_url: "https://cdn.example/uploads/42/a.jpg".into(),
            storage_key: "uploads/42/a.jpg".into(),
            file_size: 10,
            content_type: "image/jpeg".into(),
            processing_time_ms: 1,
        })
    }

    #[tokio::test]
    async fn create_allocates_distinct_queued_jobs() {
        let store = JobStore::new();
        let (a, _) = store.create(request("1")).await;
        let (b, _) = store.create(request("1")).await;
        assert_ne!(a, b);
        assert_eq!(store.get(&a).await.unwrap().status(), JobStatus::Queued);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn terminal_record_ignores_further_writes() {
        let store = JobStore::new();
        let (id, _) = store.create(request("1")).await;
        let processing = JobState::Processing { stage: JobStage::Downloading };
        assert_eq!(store.transition(&id, processing.clone()).await, Transition::Applied);
        assert_eq!(store.transition(&id, completed()).await, Transition::Applied);

        let failed = JobState::Failed(JobFailure::new(ErrorKind::Internal, "late"));
        assert_eq!(store.transition(&id, failed).await, Transition::Rejected);
        assert_eq!(store.transition(&id, processing).await, Transition::Rejected);
        assert_eq!(store.get(&id).await.unwrap().status(), JobStatus::Completed);
    }

    #[tokio::test]
    async fn remove_signals_cancel_and_drops_writeback() {
        let store = JobStore::new();
        let (id, cancel) = store.create(request("1")).await;
        assert!(!*cancel.borrow());

        assert!(store.remove(&id).await.is_some());
        assert!(*cancel.borrow());
        assert_eq!(store.transition(&id, completed()).await, Transition::Missing);
        assert!(store.remove(&id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn list_filters_by_owner() {
        let store = JobStore::new();
        store.create(request("1")).await;
        store.create(request("2")).await;
        store.create(request("1")).await;
        assert_eq!(store.list(None).await.len(), 3);
        assert_eq!(store.list(Some("1")).await.len(), 2);
        assert!(store.list(Some("3")).await.is_empty());
    }
}
