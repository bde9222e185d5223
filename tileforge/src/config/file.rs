//! Loading the configuration file.

use std::path::Path;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::settings::ConfigFile;

/// Environment variable consulted when `[api] api_key` is unset.
pub const API_KEY_ENV: &str = "PLANET_API_KEY";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults. Either way the API key
    /// falls back to [`API_KEY_ENV`] when the file does not set one.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        let mut config = if path.exists() {
            let ini = Ini::load_from_file(path)?;
            super::parser::parse_ini(&ini)?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_api_key_env(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(contents: &str) -> Result<Self, ConfigFileError> {
        let parsed = Ini::load_from_str(contents)
            .map_err(|e| ConfigFileError::ReadError(ini::Error::Parse(e)))?;
        super::parser::parse_ini(&parsed)
    }

    /// Uses `env_key` when no API key was configured.
    pub fn apply_api_key_env(&mut self, env_key: Option<String>) {
        if self.api.api_key.is_none() {
            self.api.api_key = env_key.filter(|k| !k.trim().is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();
        config.api.api_key = None;
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[api]\napi_key = from-file\nconcurrency = 2").unwrap();

        let config = ConfigFile::load_from(file.path()).unwrap();
        assert_eq!(config.api.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.api.concurrency, 2);
    }

    #[test]
    fn test_env_key_only_fills_gap() {
        let mut config = ConfigFile::default();
        config.apply_api_key_env(Some("env-key".to_string()));
        assert_eq!(config.api.api_key.as_deref(), Some("env-key"));

        config.apply_api_key_env(Some("other".to_string()));
        assert_eq!(config.api.api_key.as_deref(), Some("env-key"));

        let mut blank = ConfigFile::default();
        blank.apply_api_key_env(Some("  ".to_string()));
        assert!(blank.api.api_key.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ConfigFile::from_ini_str(
            "[api]\napi_key = sk-secret\n[order]\ncredentials = gcs-secret\n",
        )
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("gcs-secret"));
    }
}
