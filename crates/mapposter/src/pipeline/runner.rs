use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::jobs::{JobLifecycle, JobStatus, StoreError};
use crate::poster::{Collaborators, RenderJob, Theme};
use crate::request::{Coordinates, OutputFormat, PosterRequest};
use crate::sanitize;
use crate::worker::WorkerPool;

use super::error::PipelineError;

/// Drives one single-poster job from `pending` to a terminal state.
///
/// Every blocking step is handed to the worker pool; the task itself only
/// awaits. Step failures never escape `run`: they end the job as `failed`.
#[derive(Clone)]
pub struct PosterTask {
    lifecycle: JobLifecycle,
    pool: Arc<WorkerPool>,
    collaborators: Collaborators,
}

impl PosterTask {
    pub fn new(lifecycle: JobLifecycle, pool: Arc<WorkerPool>, collaborators: Collaborators) -> Self {
        Self {
            lifecycle,
            pool,
            collaborators,
        }
    }

    pub fn lifecycle(&self) -> &JobLifecycle {
        &self.lifecycle
    }

    pub(crate) fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub(crate) fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Runs the pipeline for `job_id` and returns the terminal status.
    ///
    /// An `Err` means the store itself could not be updated; the record
    /// may then still read `pending` or `processing`.
    pub async fn run(&self, job_id: String, request: PosterRequest) -> Result<JobStatus, StoreError> {
        let span = info_span!("poster_job",
            job_id = %job_id,
            theme = %request.theme,
        );

        async move {
            self.lifecycle.start(&job_id)?;
            info!("Generating poster for {}, {}", request.city, request.country);

            match self.generate(&job_id, &request).await {
                Ok(path) => {
                    let job = self
                        .lifecycle
                        .complete(&job_id, &path.to_string_lossy())?;
                    info!(output = %sanitize::redact_path(&path), "Poster completed");
                    Ok(job.status)
                }
                Err(e) => {
                    warn!("Poster generation failed: {}", e);
                    let job = self.lifecycle.fail(&job_id, &e.to_string())?;
                    Ok(job.status)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn generate(&self, job_id: &str, request: &PosterRequest) -> Result<PathBuf, PipelineError> {
        let coordinates = self
            .resolve_coordinates(&request.city, &request.country, request.explicit_coordinates())
            .await?;
        let theme = self.load_theme(&request.theme).await?;
        let destination =
            self.derive_output_path(&request.city, &theme.name, request.format, job_id);

        self.render(RenderJob {
            city: request.city.clone(),
            country: request.country.clone(),
            coordinates,
            distance: request.distance,
            destination,
            format: request.format,
            theme,
            country_label: request.country_label.clone(),
        })
        .await
    }

    /// Explicit coordinates are used as given; the geocoder is only
    /// consulted when none were supplied.
    pub(crate) async fn resolve_coordinates(
        &self,
        city: &str,
        country: &str,
        explicit: Option<Coordinates>,
    ) -> Result<Coordinates, PipelineError> {
        if let Some(coordinates) = explicit {
            debug!("Using supplied coordinates");
            return Ok(coordinates);
        }

        let geocoder = Arc::clone(&self.collaborators.geocoder);
        let (city, country) = (city.to_string(), country.to_string());
        let coordinates = self
            .pool
            .execute(move || geocoder.locate(&city, &country))
            .instrument(info_span!("resolve_coordinates"))
            .await??;

        debug!(
            "Resolved coordinates {:.4}, {:.4}",
            coordinates.latitude, coordinates.longitude
        );
        Ok(coordinates)
    }

    pub(crate) async fn load_theme(&self, name: &str) -> Result<Theme, PipelineError> {
        let themes = Arc::clone(&self.collaborators.themes);
        let name = name.to_string();
        let theme = self
            .pool
            .execute(move || themes.load(&name))
            .instrument(info_span!("load_theme"))
            .await??;
        Ok(theme)
    }

    pub(crate) fn derive_output_path(
        &self,
        city: &str,
        theme: &str,
        format: OutputFormat,
        job_id: &str,
    ) -> PathBuf {
        self.collaborators
            .namer
            .poster_path(city, theme, format, job_id)
    }

    /// Renders on the pool and returns the destination written.
    pub(crate) async fn render(&self, job: RenderJob) -> Result<PathBuf, PipelineError> {
        let renderer = Arc::clone(&self.collaborators.renderer);
        let span = info_span!("render",
            theme = %job.theme.name,
            output = %sanitize::redact_path(&job.destination),
        );

        self.pool
            .execute(move || -> Result<PathBuf, PipelineError> {
                ensure_parent_directory(&job.destination)?;
                renderer.render(&job)?;
                Ok(job.destination)
            })
            .instrument(span)
            .await?
    }
}

fn ensure_parent_directory(path: &Path) -> Result<(), PipelineError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::OutputDirectory {
                path: parent.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}
