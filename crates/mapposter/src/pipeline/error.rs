use std::path::PathBuf;
use thiserror::Error;

use crate::error::{ArchiveError, WorkerError};
use crate::poster::{GeocodeError, RenderError, ThemeError};

/// A failure inside a running pipeline. Never returned to a submitter;
/// its message becomes the job's `error`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Worker pool failure: {0}")]
    Worker(#[from] WorkerError),

    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archival failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("No posters were generated ({attempted} attempted): {reasons}")]
    NoVariantsRendered { attempted: usize, reasons: String },
}
