//! Theme catalog backed by a directory of JSON files.

use std::path::{Path, PathBuf};

use super::error::ThemeError;
use super::{Theme, ThemeCatalog};

/// Reads `<directory>/<name>.json` theme definitions.
pub struct FsThemeCatalog {
    directory: PathBuf,
}

impl FsThemeCatalog {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Theme names double as file names, so only a safe alphabet is allowed.
    fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl ThemeCatalog for FsThemeCatalog {
    fn available(&self) -> Result<Vec<String>, ThemeError> {
        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Themes directory {} does not exist", self.directory.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ThemeError::Read {
                    path: self.directory.clone(),
                    source: e,
                })
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .filter(|name| Self::is_valid_name(name))
            .collect();
        names.sort();
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<Theme, ThemeError> {
        if !Self::is_valid_name(name) {
            return Err(ThemeError::NotFound(name.to_string()));
        }

        let path = self.directory.join(format!("{}.json", name));
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ThemeError::NotFound(name.to_string()))
            }
            Err(e) => return Err(ThemeError::Read { path, source: e }),
        };

        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| ThemeError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let serde_json::Value::Object(colors) = value else {
            return Err(ThemeError::Corrupt {
                name: name.to_string(),
                reason: "expected a JSON object".to_string(),
            });
        };

        let display_name = colors
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(name)
            .to_string();
        let description = colors
            .get("description")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(Theme {
            name: name.to_string(),
            display_name,
            description,
            colors,
        })
    }
}
