//! The three legal moves of a job, applied atomically through the store.

use chrono::Utc;

use super::error::StoreError;
use super::model::{Job, JobStatus, JobUpdate};
use super::store::JobStore;

/// Applies lifecycle transitions to stored jobs.
#[derive(Clone)]
pub struct JobLifecycle {
    store: JobStore,
}

impl JobLifecycle {
    pub fn new(store: JobStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// `pending → processing`.
    pub fn start(&self, job_id: &str) -> Result<Job, StoreError> {
        self.store.update(
            job_id,
            &JobUpdate {
                status: Some(JobStatus::Processing),
                ..Default::default()
            },
        )
    }

    /// `processing → completed`, recording where the result was written.
    pub fn complete(&self, job_id: &str, result_path: &str) -> Result<Job, StoreError> {
        self.store.update(
            job_id,
            &JobUpdate {
                status: Some(JobStatus::Completed),
                completed_at: Some(Utc::now()),
                result_path: Some(result_path.to_string()),
                ..Default::default()
            },
        )
    }

    /// `processing → failed`. A blank message is replaced so that a failed
    /// record always explains itself.
    pub fn fail(&self, job_id: &str, error: &str) -> Result<Job, StoreError> {
        let error = if error.trim().is_empty() {
            "unknown error".to_string()
        } else {
            error.to_string()
        };
        self.store.update(
            job_id,
            &JobUpdate {
                status: Some(JobStatus::Failed),
                completed_at: Some(Utc::now()),
                error: Some(error),
                ..Default::default()
            },
        )
    }
}
