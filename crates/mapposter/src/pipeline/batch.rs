use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{info, info_span, warn, Instrument};

use crate::jobs::{JobStatus, StoreError};
use crate::poster::RenderJob;
use crate::request::{BatchRequest, Coordinates};
use crate::sanitize;
use crate::storage::{ArchivePackager, PackagedArchive};

use super::error::PipelineError;
use super::runner::PosterTask;

/// What happened to one theme of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantOutcome {
    Rendered { theme: String, path: PathBuf },
    Failed { theme: String, reason: String },
}

/// Per-theme outcomes of a batch, in request order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<VariantOutcome>,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn rendered_paths(&self) -> Vec<PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                VariantOutcome::Rendered { path, .. } => Some(path.clone()),
                VariantOutcome::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                VariantOutcome::Failed { theme, reason } => Some((theme.as_str(), reason.as_str())),
                VariantOutcome::Rendered { .. } => None,
            })
            .collect()
    }

    /// Folds the outcomes into the list of outputs to package, or the
    /// error that fails the batch when nothing was produced.
    pub fn into_outputs(self) -> Result<Vec<PathBuf>, PipelineError> {
        let paths = self.rendered_paths();
        if paths.is_empty() {
            let reasons = self
                .failures()
                .iter()
                .map(|(theme, reason)| format!("{}: {}", theme, reason))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PipelineError::NoVariantsRendered {
                attempted: self.attempted(),
                reasons,
            });
        }
        Ok(paths)
    }
}

/// Drives a multi-theme job: one coordinate lookup, one render per theme,
/// one archive of whatever rendered.
///
/// A failing theme is recorded and skipped. The job only fails when no
/// theme produced an output.
#[derive(Clone)]
pub struct BatchOrchestrator {
    task: PosterTask,
    packager: ArchivePackager,
}

impl BatchOrchestrator {
    pub fn new(task: PosterTask) -> Self {
        Self {
            task,
            packager: ArchivePackager::new(),
        }
    }

    pub async fn run(&self, job_id: String, request: BatchRequest) -> Result<JobStatus, StoreError> {
        let span = info_span!("batch_job",
            job_id = %job_id,
            themes = request.themes.len(),
        );

        async move {
            let lifecycle = self.task.lifecycle();
            lifecycle.start(&job_id)?;
            info!("Generating batch for {}, {}", request.city, request.country);

            match self.generate(&job_id, &request).await {
                Ok(archive) => {
                    let job = lifecycle.complete(&job_id, &archive.path.to_string_lossy())?;
                    info!(
                        archive = %sanitize::redact_path(&archive.path),
                        "Batch completed with {} poster(s)",
                        archive.entries.len()
                    );
                    Ok(job.status)
                }
                Err(e) => {
                    warn!("Batch generation failed: {}", e);
                    let job = lifecycle.fail(&job_id, &e.to_string())?;
                    Ok(job.status)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn generate(
        &self,
        job_id: &str,
        request: &BatchRequest,
    ) -> Result<PackagedArchive, PipelineError> {
        let coordinates = self
            .task
            .resolve_coordinates(&request.city, &request.country, request.explicit_coordinates())
            .await?;
        let themes = self.themes_for(request).await?;

        let report = self
            .render_variants(job_id, request, coordinates, &themes)
            .await;
        log_partial_failure(&report);

        let outputs = report.into_outputs()?;
        self.package(outputs, request, job_id).await
    }

    /// The requested themes, or every available theme when none were named.
    async fn themes_for(&self, request: &BatchRequest) -> Result<Vec<String>, PipelineError> {
        if !request.themes.is_empty() {
            return Ok(request.themes.clone());
        }
        let catalog = Arc::clone(&self.task.collaborators().themes);
        let themes = self.task.pool().execute(move || catalog.available()).await??;
        Ok(themes)
    }

    pub(crate) async fn render_variants(
        &self,
        job_id: &str,
        request: &BatchRequest,
        coordinates: Coordinates,
        themes: &[String],
    ) -> BatchReport {
        let variants = themes.iter().map(|theme| {
            self.render_variant(job_id, request, coordinates, theme)
                .instrument(info_span!("variant", theme = %theme))
        });

        BatchReport {
            outcomes: join_all(variants).await,
        }
    }

    async fn render_variant(
        &self,
        job_id: &str,
        request: &BatchRequest,
        coordinates: Coordinates,
        theme_name: &str,
    ) -> VariantOutcome {
        match self
            .try_render_variant(job_id, request, coordinates, theme_name)
            .await
        {
            Ok(path) => VariantOutcome::Rendered {
                theme: theme_name.to_string(),
                path,
            },
            Err(e) => {
                warn!("Skipping theme: {}", e);
                VariantOutcome::Failed {
                    theme: theme_name.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_render_variant(
        &self,
        job_id: &str,
        request: &BatchRequest,
        coordinates: Coordinates,
        theme_name: &str,
    ) -> Result<PathBuf, PipelineError> {
        let theme = self.task.load_theme(theme_name).await?;
        let destination =
            self.task
                .derive_output_path(&request.city, &theme.name, request.format, job_id);

        self.task
            .render(RenderJob {
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

    async fn package(
        &self,
        outputs: Vec<PathBuf>,
        request: &BatchRequest,
        job_id: &str,
    ) -> Result<PackagedArchive, PipelineError> {
        let destination = self
            .task
            .collaborators()
            .namer
            .archive_path(&request.city, job_id);
        let packager = self.packager;

        let archive = self
            .task
            .pool()
            .execute(move || packager.package(&outputs, &destination))
            .instrument(info_span!("package_archive"))
            .await??;
        Ok(archive)
    }
}

fn log_partial_failure(report: &BatchReport) {
    let failures = report.failures();
    if failures.is_empty() {
        return;
    }
    let themes = failures
        .iter()
        .map(|(theme, _)| *theme)
        .collect::<Vec<_>>()
        .join(", ");
    warn!(
        "{} of {} theme(s) failed: {}",
        failures.len(),
        report.attempted(),
        themes
    );
}
