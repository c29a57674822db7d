//! Submission payloads and their structural validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_THEME: &str = "feature_based";
pub const DEFAULT_DISTANCE: u32 = 29_000;
pub const MIN_DISTANCE: u32 = 1_000;
pub const MAX_DISTANCE: u32 = 50_000;
const MAX_NAME_LEN: usize = 100;

/// Poster output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
    Pdf,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
            OutputFormat::Pdf => "pdf",
        }
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

fn default_distance() -> u32 {
    DEFAULT_DISTANCE
}

/// Request for a single poster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosterRequest {
    pub city: String,
    pub country: String,
    /// Latitude; skips geocoding when given together with `lon`.
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Map radius in meters.
    #[serde(default = "default_distance")]
    pub distance: u32,
    #[serde(default)]
    pub format: OutputFormat,
    /// Replaces the country text printed on the poster.
    #[serde(default)]
    pub country_label: Option<String>,
}

impl PosterRequest {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
            lat: None,
            lon: None,
            theme: default_theme(),
            distance: DEFAULT_DISTANCE,
            format: OutputFormat::default(),
            country_label: None,
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn with_coordinates(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Coordinates supplied at submission, if both halves are present.
    pub fn explicit_coordinates(&self) -> Option<Coordinates> {
        explicit_coordinates(self.lat, self.lon)
    }

    /// Checks everything that can be checked without the theme catalog.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_subject(
            &self.city,
            &self.country,
            self.lat,
            self.lon,
            self.distance,
            self.country_label.as_deref(),
        )
    }
}

/// Request for one poster per theme, delivered as a single archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Themes to render; empty means every available theme.
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default = "default_distance")]
    pub distance: u32,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub country_label: Option<String>,
}

impl BatchRequest {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
            lat: None,
            lon: None,
            themes: Vec::new(),
            distance: DEFAULT_DISTANCE,
            format: OutputFormat::default(),
            country_label: None,
        }
    }

    pub fn with_themes<I, S>(mut self, themes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.themes = themes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_coordinates(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    pub fn explicit_coordinates(&self) -> Option<Coordinates> {
        explicit_coordinates(self.lat, self.lon)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_subject(
            &self.city,
            &self.country,
            self.lat,
            self.lon,
            self.distance,
            self.country_label.as_deref(),
        )?;

        let mut seen = HashSet::new();
        for theme in &self.themes {
            if !seen.insert(theme.as_str()) {
                return Err(ValidationError::DuplicateTheme(theme.clone()));
            }
        }
        Ok(())
    }
}

fn explicit_coordinates(lat: Option<f64>, lon: Option<f64>) -> Option<Coordinates> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    }
}

fn check_length(field: &'static str, value: &str, min: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > MAX_NAME_LEN {
        return Err(ValidationError::Length {
            field,
            min,
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails `contains` and is rejected with the rest.
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn validate_subject(
    city: &str,
    country: &str,
    lat: Option<f64>,
    lon: Option<f64>,
    distance: u32,
    country_label: Option<&str>,
) -> Result<(), ValidationError> {
    check_length("city", city, 1)?;
    check_length("country", country, 1)?;
    if let Some(label) = country_label {
        check_length("country_label", label, 0)?;
    }

    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            check_range("lat", lat, -90.0, 90.0)?;
            check_range("lon", lon, -180.0, 180.0)?;
        }
        (None, None) => {}
        _ => return Err(ValidationError::CoordinatePair),
    }

    check_range(
        "distance",
        f64::from(distance),
        f64::from(MIN_DISTANCE),
        f64::from(MAX_DISTANCE),
    )
}
