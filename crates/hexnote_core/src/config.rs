//! Core configuration file.
//!
//! # Invariants
//! - Every field has a default; an empty `{}` file is a valid config.
//! - A missing config file is created empty on first load.

use crate::logging::default_log_level;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_DB_FILE_NAME: &str = "hexnote.db";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to access config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db: DbConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// SQLite file path. Relative paths resolve against the config file's
    /// directory.
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE_NAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute log directory; logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

impl CoreConfig {
    /// Database path with relative values resolved against `base_dir`.
    pub fn resolved_db_path(&self, base_dir: &Path) -> PathBuf {
        if self.db.path.is_absolute() {
            self.db.path.clone()
        } else {
            base_dir.join(&self.db.path)
        }
    }
}

/// Parses a config from JSON text.
pub fn parse_config(text: &str, path: &Path) -> Result<CoreConfig, ConfigError> {
    serde_json::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the config at `path`, creating an empty one when it is missing.
pub fn load_or_init_config(path: impl AsRef<Path>) -> Result<CoreConfig, ConfigError> {
    let path = path.as_ref();
    let io_error = |source: std::io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if !path.exists() {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, "{}").map_err(io_error)?;
        info!("event=config_init module=config status=ok created=true");
        return Ok(CoreConfig::default());
    }

    let text = std::fs::read_to_string(path).map_err(io_error)?;
    parse_config(&text, path)
}
