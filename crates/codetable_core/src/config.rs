//! TOML configuration for embedding the code stores.
//!
//! # Responsibility
//! - Describe where the database lives, how logging is set up and which
//!   cascade policy the large-code store uses.
//! - Reject invalid values at load time instead of at first use.
//!
//! Every section is optional:
//!
//! ```toml
//! [database]
//! path = "/var/lib/codetable/codes.sqlite3"
//! busy_timeout_ms = 5000
//!
//! [logging]
//! level = "info"
//! dir = "/var/log/codetable"
//!
//! [cascade]
//! save = true
//! delete = true
//! ```

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::parse_level;
use crate::repo::CascadePolicy;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors from configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: Option<PathBuf>,
        message: String,
    },
    InvalidValue(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config file `{}`: {source}", path.display())
            }
            Self::Parse {
                path: Some(path),
                message,
            } => write!(f, "failed to parse config file `{}`: {message}", path.display()),
            Self::Parse {
                path: None,
                message,
            } => write!(f, "failed to parse config: {message}"),
            Self::InvalidValue(message) => write!(f, "invalid config value: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { .. } | Self::InvalidValue(_) => None,
        }
    }
}

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub cascade: CascadePolicy,
}

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file. `None` selects an in-memory database.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
        }
    }
}

/// `[logging]` section. File logging stays off while `dir` is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`; build-mode default when unset.
    pub level: Option<String>,
    /// Absolute directory for rolling log files.
    pub dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|err| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: None,
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.busy_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "database.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(level) = self.logging.level.as_deref() {
            parse_level(level).map_err(ConfigError::InvalidValue)?;
        }
        if let Some(dir) = self.logging.dir.as_deref() {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue(format!(
                    "logging.dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}
