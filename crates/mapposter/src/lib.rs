pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod poster;
pub mod request;
pub mod retention;
pub mod sanitize;
pub mod service;
pub mod storage;
pub mod telemetry;
pub mod worker;

pub use config::{load_config, Config};
pub use error::{
    ArchiveError, ConfigError, MapPosterError, Result, ServiceError, ValidationError, WorkerError,
};
pub use jobs::{Job, JobLifecycle, JobStatus, JobStore, JobUpdate, StoreError};
pub use pipeline::{BatchOrchestrator, PosterTask};
pub use poster::{Collaborators, DestinationNamer, Geocoder, RenderJob, Renderer, Theme, ThemeCatalog};
pub use request::{BatchRequest, Coordinates, OutputFormat, PosterRequest};
pub use retention::RetentionSweeper;
pub use service::{Artifact, HealthReport, JobHandle, PosterService};
pub use storage::{ArchivePackager, PackagedArchive};
pub use worker::WorkerPool;
