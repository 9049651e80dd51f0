//! Application configuration
//!
//! Loaded from a TOML file when present; every field has a workable
//! default so a missing file is not an error.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("No home directory available to place application data")]
    NoProjectDirs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the booking backend
    pub api_url: String,
    /// Override for the data directory; platform default when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or fall back to defaults if the file is absent
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)?;
        debug!(path = %path.display(), api_url = %config.api_url, "Config loaded");
        Ok(config)
    }

    /// Path of the SQLite database file
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => ProjectDirs::from("dev", "tider", "tider")
                .ok_or(ConfigError::NoProjectDirs)?
                .data_dir()
                .to_path_buf(),
        };
        Ok(dir.join("tider.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load(Some(Path::new("/nonexistent/tider.toml"))).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tider.toml");
        std::fs::write(
            &path,
            "api_url = \"https://booking.example.com/api\"\ndata_dir = \"/tmp/tider\"\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api_url, "https://booking.example.com/api");
        assert_eq!(config.data_dir.as_deref(), Some(Path::new("/tmp/tider")));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tider.toml");
        std::fs::write(&path, "data_dir = \"/tmp/tider\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_database_path_honors_override() {
        let config = AppConfig {
            data_dir: Some(PathBuf::from("/tmp/tider")),
            ..Default::default()
        };
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/tider/tider.db")
        );
    }
}
