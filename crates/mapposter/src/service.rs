//! The submission and query surface.
//!
//! Submissions are validated synchronously, recorded as `pending` and
//! handed to a spawned pipeline task; the caller gets the job id back
//! immediately. Pipeline work runs on the worker pool; catalog reads made
//! while accepting a submission do not.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::TimeDelta;
use log::info;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::{Config, RetentionConfig};
use crate::error::{MapPosterError, ServiceError, ValidationError};
use crate::jobs::{Job, JobLifecycle, JobStatus, JobStore, StoreError};
use crate::pipeline::{BatchOrchestrator, PosterTask};
use crate::poster::{
    Collaborators, FsThemeCatalog, Geocoder, Renderer, Theme, ThemeError, TimestampNamer,
};
use crate::request::{BatchRequest, Coordinates, PosterRequest};
use crate::retention::RetentionSweeper;
use crate::worker::WorkerPool;

pub const DEFAULT_LIST_LIMIT: u64 = 100;

/// A job accepted for processing.
///
/// Dropping the handle does not stop the job.
#[derive(Debug)]
pub struct JobHandle {
    job_id: String,
    task: JoinHandle<Result<JobStatus, StoreError>>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Waits for the pipeline to reach a terminal state.
    pub async fn wait(self) -> Result<JobStatus, ServiceError> {
        match self.task.await {
            Ok(result) => Ok(result?),
            Err(e) => Err(ServiceError::TaskAborted(e.to_string())),
        }
    }
}

/// A finished output ready to be streamed.
#[derive(Debug)]
pub struct Artifact {
    pub path: PathBuf,
    pub filename: String,
    pub media_type: String,
    pub file: tokio::fs::File,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub themes_available: usize,
    pub jobs: JobCounts,
}

pub struct PosterService {
    store: JobStore,
    pool: Arc<WorkerPool>,
    collaborators: Collaborators,
    task: PosterTask,
    batch: BatchOrchestrator,
}

impl PosterService {
    pub fn new(store: JobStore, pool: Arc<WorkerPool>, collaborators: Collaborators) -> Self {
        let task = PosterTask::new(
            JobLifecycle::new(store.clone()),
            Arc::clone(&pool),
            collaborators.clone(),
        );
        let batch = BatchOrchestrator::new(task.clone());

        Self {
            store,
            pool,
            collaborators,
            task,
            batch,
        }
    }

    /// Production constructor: opens the job database and wires the
    /// filesystem theme catalog and timestamp namer from `config`.
    pub fn from_config(
        config: &Config,
        geocoder: Arc<dyn Geocoder>,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self, MapPosterError> {
        let store = JobStore::open(&config.resolved_database_path())?;
        let pool = Arc::new(WorkerPool::new(config.worker_count)?);
        let collaborators = Collaborators {
            geocoder,
            themes: Arc::new(FsThemeCatalog::new(&config.themes_directory)),
            renderer,
            namer: Arc::new(
                TimestampNamer::new(&config.posters_directory)
                    .with_unique_suffix(config.unique_destinations),
            ),
        };

        Ok(Self::new(store, pool, collaborators))
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub async fn submit(&self, request: PosterRequest) -> Result<JobHandle, ServiceError> {
        request.validate()?;
        let available = self.themes().await?;
        ensure_known_theme(&request.theme, &available)?;

        let job_id = self.record(&request)?;
        info!("Accepted poster job {} for {}", job_id, request.city);

        let task = self.task.clone();
        let id = job_id.clone();
        let handle = tokio::spawn(async move { task.run(id, request).await });

        Ok(JobHandle {
            job_id,
            task: handle,
        })
    }

    /// Accepts a multi-theme job. An empty theme list renders every
    /// available theme.
    pub async fn submit_batch(&self, request: BatchRequest) -> Result<JobHandle, ServiceError> {
        request.validate()?;
        let available = self.themes().await?;
        if available.is_empty() {
            return Err(ValidationError::NoThemes.into());
        }
        for theme in &request.themes {
            ensure_known_theme(theme, &available)?;
        }

        let job_id = self.record(&request)?;
        info!(
            "Accepted batch job {} for {} ({} theme(s))",
            job_id,
            request.city,
            if request.themes.is_empty() {
                available.len()
            } else {
                request.themes.len()
            }
        );

        let batch = self.batch.clone();
        let id = job_id.clone();
        let handle = tokio::spawn(async move { batch.run(id, request).await });

        Ok(JobHandle {
            job_id,
            task: handle,
        })
    }

    fn record<T: Serialize>(&self, request: &T) -> Result<String, ServiceError> {
        let job_id = uuid::Uuid::new_v4().to_string();
        let snapshot = serde_json::to_value(request).map_err(StoreError::from)?;
        self.store.create(&job_id, &snapshot)?;
        Ok(job_id)
    }

    pub fn query(&self, job_id: &str) -> Result<Job, ServiceError> {
        Ok(self.store.get(job_id)?)
    }

    /// Newest jobs first; `limit` defaults to [`DEFAULT_LIST_LIMIT`].
    pub fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: Option<u64>,
    ) -> Result<Vec<Job>, ServiceError> {
        Ok(self
            .store
            .list(status, limit.unwrap_or(DEFAULT_LIST_LIMIT))?)
    }

    /// Opens the output of a completed job.
    pub async fn fetch_artifact(&self, job_id: &str) -> Result<Artifact, ServiceError> {
        let job = self.store.get(job_id)?;
        if job.status != JobStatus::Completed {
            return Err(ServiceError::NotReady {
                job_id: job.id,
                status: job.status,
            });
        }

        let path = job.result_path.map(PathBuf::from).unwrap_or_default();
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ServiceError::ArtifactMissing {
                job_id: job.id,
                path,
            });
        }

        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| ServiceError::OpenArtifact {
                path: path.clone(),
                source: e,
            })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| job.id.clone());
        let media_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();

        Ok(Artifact {
            path,
            filename,
            media_type,
            file,
        })
    }

    /// Catalog reads run on tokio's blocking threads, never on the render
    /// pool, so submissions and health checks are not queued behind renders.
    pub async fn themes(&self) -> Result<Vec<String>, ServiceError> {
        let catalog = Arc::clone(&self.collaborators.themes);
        read_catalog(move || catalog.available()).await
    }

    pub async fn theme(&self, name: &str) -> Result<Theme, ServiceError> {
        let catalog = Arc::clone(&self.collaborators.themes);
        let name = name.to_string();
        read_catalog(move || catalog.load(&name)).await
    }

    pub async fn geocode(&self, city: &str, country: &str) -> Result<Coordinates, ServiceError> {
        let geocoder = Arc::clone(&self.collaborators.geocoder);
        let (city, country) = (city.to_string(), country.to_string());
        Ok(self
            .pool
            .execute(move || geocoder.locate(&city, &country))
            .await??)
    }

    pub async fn health(&self) -> Result<HealthReport, ServiceError> {
        let themes_available = self.themes().await?.len();
        let jobs = JobCounts {
            pending: self.store.count(JobStatus::Pending)?,
            processing: self.store.count(JobStatus::Processing)?,
            completed: self.store.count(JobStatus::Completed)?,
            failed: self.store.count(JobStatus::Failed)?,
        };

        Ok(HealthReport {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            themes_available,
            jobs,
        })
    }

    pub fn purge_older_than(&self, max_age: TimeDelta) -> Result<u64, ServiceError> {
        Ok(self.store.purge_older_than(max_age)?)
    }

    /// A sweeper over this service's store. Call `start` on it to run.
    pub fn retention_sweeper(&self, retention: &RetentionConfig) -> RetentionSweeper {
        RetentionSweeper::new(
            self.store.clone(),
            retention.max_age(),
            retention.sweep_interval(),
        )
    }

    /// Stops accepting work on the pool. Running jobs whose next step has
    /// not been dispatched end as `failed`.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

async fn read_catalog<F, T>(read: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, ThemeError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(read).await {
        Ok(result) => Ok(result?),
        Err(e) => Err(ServiceError::TaskAborted(e.to_string())),
    }
}

fn ensure_known_theme(name: &str, available: &[String]) -> Result<(), ValidationError> {
    if available.iter().any(|t| t == name) {
        return Ok(());
    }
    Err(ValidationError::UnknownTheme {
        name: name.to_string(),
        available: available.join(", "),
    })
}
