use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("Could not find coordinates for {city}, {country}")]
    NotFound { city: String, country: String },

    #[error("Geocoding failed: {0}")]
    Service(String),
}

#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("Theme '{0}' not found")]
    NotFound(String),

    #[error("Failed to read theme file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Theme '{name}' is invalid: {reason}")]
    Corrupt { name: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Invalid render parameters: {0}")]
    InvalidParameters(String),

    #[error("Rendering failed: {0}")]
    Failed(String),
}
