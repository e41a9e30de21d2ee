//! Demo configuration.
//!
//! Settings come from an optional TOML file; every field has a default so
//! an empty (or absent) file is valid.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings for one demo run.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    /// Unix socket the server listens on.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Name of the table the walkthrough creates and populates.
    #[serde(default = "default_table")]
    pub table: String,

    /// Drop and recreate the table before running the walkthrough.
    #[serde(default = "default_reset_on_start")]
    pub reset_on_start: bool,
}

fn default_socket_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("basalt")
        .join("server.sock")
}

fn default_table() -> String {
    "site_users".to_string()
}

fn default_reset_on_start() -> bool {
    true
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            socket_path: default_socket_path(),
            table: default_table(),
            reset_on_start: default_reset_on_start(),
        }
    }
}

impl DemoConfig {
    pub fn from_file(path: &Path) -> Result<DemoConfig, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    #[test]
    fn test_default_config() {
        let config = DemoConfig::default();
        assert_eq!(config.table, "site_users");
        assert!(config.reset_on_start);
        assert!(config.socket_path.ends_with("basalt/server.sock"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.toml");
        fs::write(&path, "").unwrap();

        let config = DemoConfig::from_file(&path).unwrap();
        assert_eq!(config.table, "site_users");
        assert!(config.reset_on_start);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.toml");
        fs::write(&path, "table = \"people\"\nreset_on_start = false\n").unwrap();

        let config = DemoConfig::from_file(&path).unwrap();
        assert_eq!(config.table, "people");
        assert!(!config.reset_on_start);
        assert!(config.socket_path.ends_with("basalt/server.sock"));
    }

    #[test]
    fn test_socket_path_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.toml");
        fs::write(&path, "socket_path = \"/tmp/basalt-test.sock\"\n").unwrap();

        let config = DemoConfig::from_file(&path).unwrap();
        assert_eq!(config.socket_path, PathBuf::from("/tmp/basalt-test.sock"));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.toml");
        fs::write(&path, "table = [not toml").unwrap();

        let err = DemoConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = DemoConfig::from_file(Path::new("/nonexistent/demo.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
