use thiserror::Error;

use crate::db::DatabaseError;

use super::model::JobStatus;

/// Errors surfaced by the job store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Job {0} not found")]
    NotFound(String),

    #[error("Job {0} already exists")]
    AlreadyExists(String),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {id} is already {status} and can no longer change")]
    Finalized { id: String, status: JobStatus },

    #[error("Job {id} update rejected: {reason}")]
    InvariantViolation { id: String, reason: String },

    #[error("Job store unavailable: {0}")]
    Unavailable(#[from] DatabaseError),

    #[error("Failed to serialize request snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}
