//! Config file loading.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::settings::ConfigFile;

/// Errors raised while reading `config.ini`.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// File exists but is not valid INI
    #[error("Cannot read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// A key holds a value of the wrong kind
    #[error("Invalid setting [{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Reads `~/.geocontext/config.ini`.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Reads the given file, overlaying its keys on the defaults.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }
}

/// Directory holding config, registry, log and cache snapshot (`~/.geocontext`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".geocontext")
}

/// `~/.geocontext/config.ini`.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
