use std::collections::HashMap;

use autocut_core::error::CoreError;
use autocut_core::types::Job;
use tokio::sync::{broadcast, RwLock};

use crate::error::{PipelineError, Result};

const EVENT_CAPACITY: usize = 256;

/// Registry of all jobs for the lifetime of the process.
///
/// Each mutation happens under the write lock and publishes the resulting
/// snapshot on a broadcast channel.
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
    events: broadcast::Sender<Job>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            jobs: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Register a new pending job. Returns `None` if the id is taken.
    pub async fn create(&self, job_id: &str) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(job_id) {
            return None;
        }
        let job = Job::new(job_id);
        jobs.insert(job_id.to_string(), job.clone());
        let _ = self.events.send(job.clone());
        Some(job)
    }

    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        jobs
    }

    /// Apply `f` to the job atomically. If `f` rejects the transition the
    /// stored job is left untouched.
    pub async fn update<F>(&self, job_id: &str, f: F) -> Result<Job>
    where
        F: FnOnce(&mut Job) -> std::result::Result<(), CoreError>,
    {
        let mut jobs = self.jobs.write().await;
        let stored = jobs
            .get_mut(job_id)
            .ok_or_else(|| PipelineError::JobMissing(job_id.to_string()))?;

        let mut next = stored.clone();
        f(&mut next)?;
        *stored = next.clone();
        let _ = self.events.send(next.clone());
        Ok(next)
    }

    pub async fn checkpoint(&self, job_id: &str, progress: u8, message: &str) -> Result<Job> {
        self.update(job_id, |job| job.checkpoint(progress, message))
            .await
    }

    pub async fn complete(&self, job_id: &str, output_url: &str) -> Result<Job> {
        self.update(job_id, |job| job.complete(output_url)).await
    }

    pub async fn fail(&self, job_id: &str, error: &str) -> Result<Job> {
        self.update(job_id, |job| job.fail(error)).await
    }

    /// Snapshots of every job after each mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<Job> {
        self.events.subscribe()
    }

    /// Wait until `job_id` is completed or failed. Returns `None` for an
    /// unknown job.
    pub async fn wait_terminal(&self, job_id: &str) -> Option<Job> {
        let mut rx = self.subscribe();
        loop {
            let job = self.get(job_id).await?;
            if job.status.is_terminal() {
                return Some(job);
            }
            loop {
                match rx.recv().await {
                    Ok(update) if update.job_id == job_id && update.status.is_terminal() => {
                        return Some(update)
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => break,
                    Err(broadcast::error::RecvError::Closed) => return self.get(job_id).await,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocut_core::types::JobStatus;

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let store = JobStore::new();
        assert!(store.create("ab12cd34").await.is_some());
        assert!(store.create("ab12cd34").await.is_none());
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn updates_are_published_in_order() {
        let store = JobStore::new();
        let mut rx = store.subscribe();

        store.create("j1").await.unwrap();
        store.checkpoint("j1", 5, "Analyzing video...").await.unwrap();
        store.checkpoint("j1", 10, "Extracting audio...").await.unwrap();
        store.complete("j1", "/download/j1").await.unwrap();

        let mut seen = Vec::new();
        while let Ok(job) = rx.try_recv() {
            seen.push((job.status, job.progress));
        }
        assert_eq!(
            seen,
            vec![
                (JobStatus::Pending, 0),
                (JobStatus::Processing, 5),
                (JobStatus::Processing, 10),
                (JobStatus::Completed, 100),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_transition_leaves_job_unchanged() {
        let store = JobStore::new();
        store.create("j").await.unwrap();
        store.checkpoint("j", 50, "Generating subtitles...").await.unwrap();

        let err = store.checkpoint("j", 20, "back").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Core(CoreError::ProgressRegression { .. })
        ));
        let job = store.get("j").await.unwrap();
        assert_eq!(job.progress, 50);
        assert_eq!(job.message, "Generating subtitles...");
    }

    #[tokio::test]
    async fn failed_job_stays_failed() {
        let store = JobStore::new();
        store.create("j").await.unwrap();
        store.checkpoint("j", 20, "Transcribing...").await.unwrap();
        store.fail("j", "boom").await.unwrap();

        assert!(store.checkpoint("j", 50, "later").await.is_err());
        assert!(store.complete("j", "/download/j").await.is_err());
        let job = store.get("j").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn pending_job_cannot_fail() {
        let store = JobStore::new();
        store.create("j").await.unwrap();

        let err = store.fail("j", "copy failed").await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Core(CoreError::InvalidTransition { .. })
        ));
        assert_eq!(store.get("j").await.unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_job_is_reported() {
        let store = JobStore::new();
        assert!(matches!(
            store.checkpoint("nope", 5, "x").await,
            Err(PipelineError::JobMissing(_))
        ));
        assert!(store.wait_terminal("nope").await.is_none());
    }

    #[tokio::test]
    async fn wait_terminal_sees_later_completion() {
        let store = std::sync::Arc::new(JobStore::new());
        store.create("j").await.unwrap();

        let writer = store.clone();
        let handle = tokio::spawn(async move {
            writer.checkpoint("j", 80, "Rendering video...").await.unwrap();
            writer.complete("j", "/download/j").await.unwrap();
        });

        let job = store.wait_terminal("j").await.unwrap();
        handle.await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }
}
