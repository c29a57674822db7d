//! Test harness for isolated service execution.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use mapposter::poster::TimestampNamer;
use mapposter::{
    Collaborators, Job, JobStatus, JobStore, PosterService, ServiceError, WorkerPool,
};

use super::fakes::{CountingGeocoder, FakeRenderer, StaticThemes, PARIS};

pub struct TestHarness {
    /// Keeps the posters directory alive for the test's duration.
    temp_dir: TempDir,
    pub posters_dir: PathBuf,
    pub geocoder: Arc<CountingGeocoder>,
    pub renderer: Arc<FakeRenderer>,
    pub service: PosterService,
}

impl TestHarness {
    /// Harness with the given themes, a Paris-resolving geocoder and a
    /// renderer that always succeeds.
    pub fn new(themes: &[&str]) -> Self {
        Self::with(
            themes,
            CountingGeocoder::resolving_to(PARIS),
            FakeRenderer::new(),
        )
    }

    pub fn with(themes: &[&str], geocoder: CountingGeocoder, renderer: FakeRenderer) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let posters_dir = temp_dir.path().join("posters");
        let store = JobStore::open(&temp_dir.path().join("jobs.db")).expect("Failed to open store");
        let pool = Arc::new(WorkerPool::new(4).expect("Failed to start worker pool"));

        let geocoder = Arc::new(geocoder);
        let renderer = Arc::new(renderer);
        let collaborators = Collaborators {
            geocoder: Arc::clone(&geocoder) as _,
            themes: Arc::new(StaticThemes::new(themes)),
            renderer: Arc::clone(&renderer) as _,
            namer: Arc::new(TimestampNamer::new(&posters_dir).with_unique_suffix(true)),
        };

        Self {
            temp_dir,
            posters_dir,
            geocoder,
            renderer,
            service: PosterService::new(store, pool, collaborators),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn job(&self, job_id: &str) -> Job {
        self.service.query(job_id).expect("job should exist")
    }

    /// Polls until the job is terminal, checking every observation.
    pub async fn observe_until_finished(&self, job_id: &str) -> Vec<JobStatus> {
        let mut seen = Vec::new();
        for _ in 0..500 {
            let job = self.job(job_id);
            if let Err(reason) = job.check_invariants() {
                panic!("observed inconsistent job {}: {}", job_id, reason);
            }
            if seen.last() != Some(&job.status) {
                seen.push(job.status);
            }
            if job.is_finished() {
                return seen;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish, saw {:?}", job_id, seen);
    }

    pub fn assert_no_jobs(&self) {
        let jobs = self
            .service
            .list_jobs(None, None)
            .expect("listing jobs should succeed");
        assert!(jobs.is_empty(), "expected no jobs, found {:?}", jobs);
    }
}

/// Unwraps the variant of a `ServiceError`, with the error in the panic.
pub fn expect_err<T: std::fmt::Debug>(result: Result<T, ServiceError>) -> ServiceError {
    match result {
        Ok(value) => panic!("expected an error, got {:?}", value),
        Err(e) => e,
    }
}
