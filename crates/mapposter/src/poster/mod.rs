//! Contracts of the collaborators that do the actual poster work.
//!
//! Geocoding and rendering live outside this crate; the pipelines only
//! see them through these traits. All methods are blocking and are always
//! called from the worker pool.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::request::{Coordinates, OutputFormat};

pub mod error;
pub mod naming;
pub mod themes;

pub use error::{GeocodeError, RenderError, ThemeError};
pub use naming::TimestampNamer;
pub use themes::FsThemeCatalog;

/// A loaded style definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    /// Identifier (file stem).
    pub name: String,
    /// Human readable name.
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The raw definition, colours included.
    pub colors: serde_json::Map<String, serde_json::Value>,
}

/// Everything the renderer needs for one poster.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub city: String,
    pub country: String,
    pub coordinates: Coordinates,
    /// Map radius in meters.
    pub distance: u32,
    pub destination: PathBuf,
    pub format: OutputFormat,
    pub theme: Theme,
    pub country_label: Option<String>,
}

/// Turns a place name into coordinates.
pub trait Geocoder: Send + Sync {
    fn locate(&self, city: &str, country: &str) -> Result<Coordinates, GeocodeError>;
}

/// Source of style definitions.
pub trait ThemeCatalog: Send + Sync {
    /// Names of every loadable theme.
    fn available(&self) -> Result<Vec<String>, ThemeError>;

    fn load(&self, name: &str) -> Result<Theme, ThemeError>;
}

/// Draws a poster and writes it to `job.destination`.
pub trait Renderer: Send + Sync {
    fn render(&self, job: &RenderJob) -> Result<(), RenderError>;
}

/// Decides where outputs are written.
pub trait DestinationNamer: Send + Sync {
    fn poster_path(&self, city: &str, theme: &str, format: OutputFormat, job_id: &str) -> PathBuf;

    fn archive_path(&self, city: &str, job_id: &str) -> PathBuf;
}

/// The set of collaborators shared by every pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub geocoder: Arc<dyn Geocoder>,
    pub themes: Arc<dyn ThemeCatalog>,
    pub renderer: Arc<dyn Renderer>,
    pub namer: Arc<dyn DestinationNamer>,
}
