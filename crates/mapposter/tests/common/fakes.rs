#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mapposter::poster::{GeocodeError, RenderError, ThemeError};
use mapposter::{Coordinates, Geocoder, RenderJob, Renderer, Theme, ThemeCatalog};

pub const PARIS: Coordinates = Coordinates {
    latitude: 48.8566,
    longitude: 2.3522,
};

/// Geocoder returning a fixed answer and counting how often it was asked.
pub struct CountingGeocoder {
    calls: AtomicUsize,
    answer: Option<Coordinates>,
}

impl CountingGeocoder {
    pub fn resolving_to(coordinates: Coordinates) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            answer: Some(coordinates),
        }
    }

    pub fn unresolvable() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            answer: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Geocoder for CountingGeocoder {
    fn locate(&self, city: &str, country: &str) -> Result<Coordinates, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.ok_or_else(|| GeocodeError::NotFound {
            city: city.to_string(),
            country: country.to_string(),
        })
    }
}

/// Theme catalog held in memory.
pub struct StaticThemes {
    themes: BTreeMap<String, Theme>,
}

impl StaticThemes {
    pub fn new(names: &[&str]) -> Self {
        let themes = names
            .iter()
            .map(|name| {
                let mut colors = serde_json::Map::new();
                colors.insert("bg".to_string(), serde_json::json!("#000000"));
                (
                    name.to_string(),
                    Theme {
                        name: name.to_string(),
                        display_name: name.to_uppercase(),
                        description: Some(format!("The {} theme", name)),
                        colors,
                    },
                )
            })
            .collect();
        Self { themes }
    }
}

impl ThemeCatalog for StaticThemes {
    fn available(&self) -> Result<Vec<String>, ThemeError> {
        Ok(self.themes.keys().cloned().collect())
    }

    fn load(&self, name: &str) -> Result<Theme, ThemeError> {
        self.themes
            .get(name)
            .cloned()
            .ok_or_else(|| ThemeError::NotFound(name.to_string()))
    }
}

/// Renderer writing a small text file per poster.
///
/// Themes in `failing` return an error. Themes in `phantom` report success
/// without writing anything, as if the file had been cleaned up afterwards.
#[derive(Default)]
pub struct FakeRenderer {
    failing: HashSet<String>,
    phantom: HashSet<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, themes: &[&str]) -> Self {
        self.failing.extend(themes.iter().map(|t| t.to_string()));
        self
    }

    pub fn phantom_for(mut self, themes: &[&str]) -> Self {
        self.phantom.extend(themes.iter().map(|t| t.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Renderer for FakeRenderer {
    fn render(&self, job: &RenderJob) -> Result<(), RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let theme = job.theme.name.as_str();
        if self.failing.contains(theme) {
            return Err(RenderError::Failed(format!("no street data for {}", theme)));
        }
        if self.phantom.contains(theme) {
            return Ok(());
        }

        let content = format!(
            "{}|{}|{}|{:.4},{:.4}",
            job.city, job.country, theme, job.coordinates.latitude, job.coordinates.longitude
        );
        std::fs::write(&job.destination, content).map_err(|e| RenderError::Failed(e.to_string()))
    }
}
