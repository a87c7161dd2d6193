//! Configuration loading.
//!
//! Configuration lives in an optional TOML file. Every field has a default,
//! so a missing file (or a file with only some sections) is valid:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! max_clients = 5
//!
//! [todo]
//! path = "tasks_personal.txt"
//! max_items = 100
//!
//! [qr]
//! program = "qrencode"
//! format = "UTF8"
//! ```
//!
//! The file is looked up at `$COSHELL_CONFIG`, falling back to
//! `<config_dir>/coshell/config.toml`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "COSHELL_CONFIG";

/// Maximum number of simultaneously registered chat connections.
pub const DEFAULT_MAX_CLIENTS: usize = 5;

/// Maximum number of todo items loaded from disk.
pub const DEFAULT_MAX_TODO: usize = 100;

/// Todo file, relative to the working directory.
pub const DEFAULT_TODO_FILE: &str = "tasks_personal.txt";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML for our schema.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but is out of range.
    #[error("Invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub todo: TodoConfig,
    pub qr: QrConfig,
}

/// Chat server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Interface to bind; all interfaces by default.
    pub host: String,

    /// Registry capacity.
    pub max_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

/// Todo list settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TodoConfig {
    pub path: PathBuf,
    pub max_items: usize,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_TODO_FILE),
            max_items: DEFAULT_MAX_TODO,
        }
    }
}

/// QR renderer settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QrConfig {
    /// Program invoked to render a QR code.
    pub program: String,

    /// Output type passed as `-t`. `UTF8` renders without ANSI colour codes.
    pub format: String,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            program: "qrencode".to_string(),
            format: "UTF8".to_string(),
        }
    }
}

impl Config {
    /// Returns the config file path: `$COSHELL_CONFIG`, else the user config dir.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("coshell").join("config.toml"))
    }

    /// Loads configuration from the default location.
    ///
    /// A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads configuration from `path`, using defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_clients == 0 {
            return Err(ConfigError::Invalid {
                field: "server.max_clients".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.qr.program.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "qr.program".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_limits() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.max_clients, 5);
        assert_eq!(config.todo.path, PathBuf::from("tasks_personal.txt"));
        assert_eq!(config.todo.max_items, 100);
        assert_eq!(config.qr.program, "qrencode");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nmax_clients = 8\n\n[qr]\nformat = \"ANSIUTF8\"").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.max_clients, 8);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.qr.format, "ANSIUTF8");
        assert_eq!(config.qr.program, "qrencode");
        assert_eq!(config.todo, TodoConfig::default());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nhost = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nport_typo = 1\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nmax_clients = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("server.max_clients"));
    }
}
