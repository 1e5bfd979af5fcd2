//! Application configuration.
//!
//! Settings are read from `~/.geocontext/config.ini`. Every key is optional;
//! missing keys keep their defaults.
//!
//! ```ini
//! [fetch]
//! connection_limit = 100
//! connect_timeout = 2
//! total_timeout = 20
//! offload_threshold = 1000
//!
//! [cache]
//! cache_null_values = true
//! snapshot = ~/.geocontext/cache.json
//!
//! [registry]
//! file = ~/.geocontext/registry.ini
//!
//! [logging]
//! file = ~/.geocontext/geocontext.log
//! ```

mod file;
mod parser;
mod settings;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub(crate) use parser::expand_tilde;
pub use settings::{
    CacheSettings, ConfigFile, FetchSettings, LoggingSettings, RegistrySettings,
    DEFAULT_CONNECTION_LIMIT, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_OFFLOAD_THRESHOLD,
    DEFAULT_TOTAL_TIMEOUT_SECS,
};
