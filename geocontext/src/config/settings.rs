//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;
use std::time::Duration;

use super::file::config_directory;

/// Maximum concurrent connections per fetch batch.
pub const DEFAULT_CONNECTION_LIMIT: usize = 100;

/// Connect timeout for each request in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 2;

/// Deadline for a whole fetch batch in seconds.
pub const DEFAULT_TOTAL_TIMEOUT_SECS: u64 = 20;

/// Ordinate count above which geometry parsing leaves the async workers.
pub const DEFAULT_OFFLOAD_THRESHOLD: usize = 1_000;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Outbound request settings
    pub fetch: FetchSettings,
    /// Spatial cache settings
    pub cache: CacheSettings,
    /// Service registry location
    pub registry: RegistrySettings,
    /// Log file location
    pub logging: LoggingSettings,
}

/// Fetch batch configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// Maximum in-flight requests per batch
    pub connection_limit: usize,
    /// Connect timeout per request
    pub connect_timeout: Duration,
    /// Deadline for the whole batch
    pub total_timeout: Duration,
    /// Raw geometries with more ordinates than this are parsed on the
    /// blocking pool
    pub offload_threshold: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            total_timeout: Duration::from_secs(DEFAULT_TOTAL_TIMEOUT_SECS),
            offload_threshold: DEFAULT_OFFLOAD_THRESHOLD,
        }
    }
}

/// Spatial cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Store results of fetches that produced no value
    pub cache_null_values: bool,
    /// JSON snapshot used to keep the cache between runs
    pub snapshot: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_null_values: true,
            snapshot: config_directory().join("cache.json"),
        }
    }
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySettings {
    /// Registry INI document
    pub file: PathBuf,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            file: config_directory().join("registry.ini"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: config_directory().join("geocontext.log"),
        }
    }
}
