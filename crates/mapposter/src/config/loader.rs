use std::path::Path;

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;

/// Upper bound for `retention.max_age_days`, roughly a century.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if config.posters_directory.trim().is_empty() {
        return Err(invalid("posters_directory must not be empty"));
    }
    if config.themes_directory.trim().is_empty() {
        return Err(invalid("themes_directory must not be empty"));
    }
    if let Some(path) = &config.database_path {
        if path.trim().is_empty() {
            return Err(invalid("database_path must not be empty when set"));
        }
    }

    if config.worker_count == 0 {
        return Err(invalid("worker_count must be > 0"));
    }

    if config.retention.max_age_days == 0 {
        return Err(invalid("retention.max_age_days must be > 0"));
    }
    if config.retention.max_age_days > MAX_RETENTION_DAYS {
        return Err(invalid(format!(
            "retention.max_age_days must be at most {}",
            MAX_RETENTION_DAYS
        )));
    }
    if config.retention.sweep_interval_secs == 0 {
        return Err(invalid("retention.sweep_interval_secs must be > 0"));
    }

    if config.logging.level.trim().is_empty() {
        return Err(invalid("logging.level must not be empty"));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "posters_directory": "/srv/posters",
            "themes_directory": "/srv/themes",
            "database_path": "/srv/jobs.db",
            "worker_count": 4,
            "retention": { "max_age_days": 30, "sweep_interval_secs": 600 },
            "unique_destinations": true,
            "logging": { "level": "debug", "format": "json" }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.posters_directory, "/srv/posters");
        assert_eq!(config.themes_directory, "/srv/themes");
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.retention.max_age_days, 30);
        assert_eq!(config.retention.sweep_interval().as_secs(), 600);
        assert!(config.unique_destinations);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.resolved_database_path(),
            std::path::PathBuf::from("/srv/jobs.db")
        );
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.version, "1.0");
        assert_eq!(config.posters_directory, "posters");
        assert_eq!(config.retention.max_age_days, 7);
        assert_eq!(config.retention.sweep_interval_secs, 3600);
        assert!(!config.unique_destinations);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.worker_count > 0);
    }

    #[test]
    fn test_unsupported_version() {
        let err = load_config_from_str(r#"{"version": "2.0"}"#).unwrap_err();
        assert!(err.to_string().contains("Unsupported config version: 2.0"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = load_config_from_str(r#"{"worker_count": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_zero_retention_rejected() {
        let err = load_config_from_str(r#"{"retention": {"max_age_days": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("max_age_days"));
    }

    #[test]
    fn test_oversized_retention_rejected() {
        let err =
            load_config_from_str(r#"{"retention": {"max_age_days": 100000}}"#).unwrap_err();
        assert!(err.to_string().contains("at most 36500"));

        let config = load_config_from_str(r#"{"retention": {"max_age_days": 36500}}"#).unwrap();
        assert_eq!(config.retention.max_age_days, MAX_RETENTION_DAYS);
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let err = load_config_from_str(r#"{"logging": {"format": "xml"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = load_config_from_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"posters_directory": "out"}}"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.posters_directory, "out");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/definitely/not/here/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
