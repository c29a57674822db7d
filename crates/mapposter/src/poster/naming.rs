//! Destination naming for posters and archives.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::request::OutputFormat;
use crate::sanitize::slugify;

use super::DestinationNamer;

const JOB_SUFFIX_LEN: usize = 8;

/// Names outputs `<city>_<theme>_<YYYYmmdd_HHMMSS>.<ext>` inside one directory.
///
/// The timestamp has second granularity, so two posters for the same city
/// and theme in the same second share a name. With `unique` set, a prefix
/// of the job id is appended to keep them apart.
#[derive(Debug, Clone)]
pub struct TimestampNamer {
    directory: PathBuf,
    unique: bool,
}

impl TimestampNamer {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            unique: false,
        }
    }

    pub fn with_unique_suffix(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn poster_path_at(
        &self,
        city: &str,
        theme: &str,
        format: OutputFormat,
        job_id: &str,
        at: DateTime<Utc>,
    ) -> PathBuf {
        let stem = format!("{}_{}_{}", slugify(city), theme, timestamp(at));
        self.directory
            .join(format!("{}{}.{}", stem, self.suffix(job_id), format.extension()))
    }

    pub fn archive_path_at(&self, city: &str, job_id: &str, at: DateTime<Utc>) -> PathBuf {
        let stem = format!("{}_batch_{}", slugify(city), timestamp(at));
        self.directory
            .join(format!("{}{}.zip", stem, self.suffix(job_id)))
    }

    fn suffix(&self, job_id: &str) -> String {
        if self.unique {
            let short: String = job_id.chars().take(JOB_SUFFIX_LEN).collect();
            format!("_{}", short)
        } else {
            String::new()
        }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

impl DestinationNamer for TimestampNamer {
    fn poster_path(&self, city: &str, theme: &str, format: OutputFormat, job_id: &str) -> PathBuf {
        self.poster_path_at(city, theme, format, job_id, Utc::now())
    }

    fn archive_path(&self, city: &str, job_id: &str) -> PathBuf {
        self.archive_path_at(city, job_id, Utc::now())
    }
}
