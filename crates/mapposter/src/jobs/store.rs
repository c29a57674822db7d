//! Job store with persistent database storage.

use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};

use crate::db::job_repo::{self, JobFilter};
use crate::db::{Database, DatabaseError};

use super::error::StoreError;
use super::model::{format_timestamp, Job, JobStatus, JobUpdate};

/// Outcome of a read-check-write cycle on a single row.
enum Modification {
    Missing,
    Rejected(StoreError),
    Applied(Job),
}

/// Durable, keyed storage for job records.
///
/// Each call locks the underlying connection for its whole duration, so an
/// update is observed either entirely or not at all. Cloning shares the
/// same database handle.
#[derive(Clone)]
pub struct JobStore {
    db: Database,
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens (or creates) a file-backed store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Releases the database handle held by this store.
    pub fn close(self) -> Result<(), StoreError> {
        self.db.close()?;
        Ok(())
    }

    /// Creates a pending job. Fails if the id is already taken.
    pub fn create(&self, id: &str, snapshot: &serde_json::Value) -> Result<Job, StoreError> {
        self.create_at(id, snapshot, Utc::now())
    }

    pub(crate) fn create_at(
        &self,
        id: &str,
        snapshot: &serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Result<Job, StoreError> {
        let row = Job::pending(id, snapshot.clone(), created_at).to_row();
        if !job_repo::insert(&self.db, &row)? {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        log::debug!("Created job {}", id);
        Ok(Job::try_from(row)?)
    }

    pub fn get(&self, id: &str) -> Result<Job, StoreError> {
        match job_repo::find_by_id(&self.db, id)? {
            Some(row) => Ok(Job::try_from(row)?),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Applies the fields present in `update` as one unit.
    ///
    /// The transition and the resulting field combination are checked
    /// against the current row inside the same transaction that writes it.
    pub fn update(&self, id: &str, update: &JobUpdate) -> Result<Job, StoreError> {
        let outcome = self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let Some(row) = job_repo::find_in(&tx, id)? else {
                return Ok(Modification::Missing);
            };
            let current = Job::try_from(row)?;
            let next = match current.apply(update) {
                Ok(next) => next,
                Err(e) => return Ok(Modification::Rejected(e)),
            };
            job_repo::write_mutable_in(&tx, &next.to_row())?;
            tx.commit()?;
            Ok(Modification::Applied(next))
        })?;

        match outcome {
            Modification::Applied(job) => {
                log::info!("Updated job {}: status={}", id, job.status);
                Ok(job)
            }
            Modification::Rejected(e) => {
                log::warn!("Rejected update for job {}: {}", id, e);
                Err(e)
            }
            Modification::Missing => Err(StoreError::NotFound(id.to_string())),
        }
    }

    /// Lists jobs newest first, optionally restricted to one status.
    pub fn list(&self, status: Option<JobStatus>, limit: u64) -> Result<Vec<Job>, StoreError> {
        let filter = JobFilter {
            status: status.map(|s| s.as_str().to_string()),
            limit: Some(limit),
        };
        let rows = job_repo::query(&self.db, &filter)?;
        let jobs = rows
            .into_iter()
            .map(Job::try_from)
            .collect::<Result<Vec<_>, DatabaseError>>()?;
        Ok(jobs)
    }

    pub fn count(&self, status: JobStatus) -> Result<u64, StoreError> {
        Ok(job_repo::count_by_status(&self.db, status.as_str())?)
    }

    /// Deletes every record created more than `max_age` ago, whatever its status.
    ///
    /// An age reaching back past the earliest representable instant matches
    /// nothing.
    pub fn purge_older_than(&self, max_age: TimeDelta) -> Result<u64, StoreError> {
        match Utc::now().checked_sub_signed(max_age) {
            Some(cutoff) => self.purge_created_before(cutoff),
            None => {
                log::debug!("Retention age {} predates every record, nothing to purge", max_age);
                Ok(0)
            }
        }
    }

    /// Deletes every record created strictly before `cutoff`.
    pub fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let deleted = job_repo::delete_created_before(&self.db, &format_timestamp(cutoff))?;
        if deleted > 0 {
            log::info!("Purged {} job(s) created before {}", deleted, cutoff);
        }
        Ok(deleted)
    }
}
