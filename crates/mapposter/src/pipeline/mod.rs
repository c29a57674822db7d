pub mod batch;
pub mod error;
pub mod runner;

pub use batch::{BatchOrchestrator, BatchReport, VariantOutcome};
pub use error::PipelineError;
pub use runner::PosterTask;
