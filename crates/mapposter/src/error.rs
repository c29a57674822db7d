use std::path::PathBuf;
use thiserror::Error;

use crate::jobs::{JobStatus, StoreError};
use crate::poster::{GeocodeError, ThemeError};

#[derive(Error, Debug)]
pub enum MapPosterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// A malformed submission. Raised before any job record exists.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Both latitude and longitude must be provided together")]
    CoordinatePair,

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} must be between {min} and {max} characters long")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("Theme '{name}' not found. Available: {available}")]
    UnknownTheme { name: String, available: String },

    #[error("Theme '{0}' is listed more than once")]
    DuplicateTheme(String),

    #[error("No themes are available")]
    NoThemes,
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Worker task panicked")]
    TaskPanicked,
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("None of the {attempted} output file(s) could be packaged")]
    NothingToPack { attempted: usize },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write archive '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Errors returned synchronously by the submission/query surface.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Job {0} not found")]
    JobNotFound(String),

    #[error("Job {job_id} is not completed yet. Current status: {status}")]
    NotReady { job_id: String, status: JobStatus },

    #[error("Output for job {job_id} not found at '{path}'")]
    ArtifactMissing { job_id: String, path: PathBuf },

    #[error("Failed to open '{path}': {source}")]
    OpenArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Theme '{0}' not found")]
    ThemeNotFound(String),

    #[error(transparent)]
    Theme(ThemeError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("Job task ended abnormally: {0}")]
    TaskAborted(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ServiceError::JobNotFound(id),
            other => ServiceError::Store(other),
        }
    }
}

impl From<ThemeError> for ServiceError {
    fn from(e: ThemeError) -> Self {
        match e {
            ThemeError::NotFound(name) => ServiceError::ThemeNotFound(name),
            other => ServiceError::Theme(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),

    #[error("Failed to bridge log records: {0}")]
    LogBridge(String),
}

pub type Result<T> = std::result::Result<T, MapPosterError>;
