use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::db::job_repo::JobRow;
use crate::db::DatabaseError;

use super::error::StoreError;

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Fixed-width RFC 3339 so that lexical order in SQLite equals time order.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str, job_id: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidRow {
            id: job_id.to_string(),
            reason: format!("bad timestamp '{}': {}", s, e),
        })
}

// ─── JobStatus ──────────────────────────────────────────────────────────────

/// Status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Completed and failed are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// The transition table. Anything not listed is a regression or a skip.
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

// ─── JobUpdate ──────────────────────────────────────────────────────────────

/// The closed set of fields a job update may touch.
///
/// Absent fields are left as they are. Identity, creation time and the
/// request snapshot are not representable here and so can never change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub result_path: Option<String>,
}

// ─── Job ────────────────────────────────────────────────────────────────────

/// A tracked poster generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: String,
    /// Current status.
    pub status: JobStatus,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure message, only when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Produced poster or archive, only when completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    /// Copy of the submitted request.
    pub request_snapshot: serde_json::Value,
}

impl Job {
    /// A freshly submitted job.
    pub fn pending(id: &str, request_snapshot: serde_json::Value, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            status: JobStatus::Pending,
            created_at,
            completed_at: None,
            error: None,
            result_path: None,
            request_snapshot,
        }
    }

    /// Checks the field/status coupling that must hold for every stored record.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.completed_at.is_some() != self.status.is_terminal() {
            return Err(format!(
                "completed_at must be set exactly when terminal (status {})",
                self.status
            ));
        }
        if self.error.is_some() != (self.status == JobStatus::Failed) {
            return Err(format!(
                "error must be set exactly when failed (status {})",
                self.status
            ));
        }
        if self.result_path.is_some() != (self.status == JobStatus::Completed) {
            return Err(format!(
                "result_path must be set exactly when completed (status {})",
                self.status
            ));
        }
        Ok(())
    }

    /// Returns this job with `update` applied, or the reason it is refused.
    pub fn apply(&self, update: &JobUpdate) -> Result<Job, StoreError> {
        if self.status.is_terminal() {
            return Err(StoreError::Finalized {
                id: self.id.clone(),
                status: self.status,
            });
        }

        // A status in the update must be a move; restating the current one
        // would let a job be started twice.
        let next_status = match update.status {
            Some(to) if !self.status.can_advance_to(to) => {
                return Err(StoreError::InvalidTransition {
                    id: self.id.clone(),
                    from: self.status,
                    to,
                });
            }
            Some(to) => to,
            None => self.status,
        };

        let mut next = self.clone();
        next.status = next_status;
        if let Some(completed_at) = update.completed_at {
            next.completed_at = Some(completed_at);
        }
        if let Some(ref error) = update.error {
            next.error = Some(error.clone());
        }
        if let Some(ref result_path) = update.result_path {
            next.result_path = Some(result_path.clone());
        }

        next.check_invariants()
            .map_err(|reason| StoreError::InvariantViolation {
                id: self.id.clone(),
                reason,
            })?;
        Ok(next)
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn to_row(&self) -> JobRow {
        JobRow {
            id: self.id.clone(),
            status: self.status.as_str().to_string(),
            created_at: format_timestamp(self.created_at),
            completed_at: self.completed_at.map(format_timestamp),
            error: self.error.clone(),
            result_path: self.result_path.clone(),
            request_snapshot: self.request_snapshot.to_string(),
        }
    }
}

impl TryFrom<JobRow> for Job {
    type Error = DatabaseError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|reason| DatabaseError::InvalidRow {
                id: row.id.clone(),
                reason,
            })?;
        let created_at = parse_timestamp(&row.created_at, &row.id)?;
        let completed_at = row
            .completed_at
            .as_deref()
            .map(|s| parse_timestamp(s, &row.id))
            .transpose()?;
        let request_snapshot =
            serde_json::from_str(&row.request_snapshot).map_err(|e| DatabaseError::InvalidRow {
                id: row.id.clone(),
                reason: format!("bad request snapshot: {}", e),
            })?;

        Ok(Self {
            id: row.id,
            status,
            created_at,
            completed_at,
            error: row.error,
            result_path: row.result_path,
            request_snapshot,
        })
    }
}
