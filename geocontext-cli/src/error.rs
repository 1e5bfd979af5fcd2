//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use geocontext::cache::CacheError;
use geocontext::config::ConfigFileError;
use geocontext::context::ContextError;
use geocontext::registry::RegistryError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Application config could not be read
    Config(ConfigFileError),
    /// Registry document could not be loaded
    Registry { path: PathBuf, error: RegistryError },
    /// Lookup failed
    Context(ContextError),
    /// Cache snapshot could not be read or written
    Cache(CacheError),
    /// Result could not be serialized
    Output(serde_json::Error),
    /// Services failed their health check
    ServicesOffline(usize),
}

impl CliError {
    /// Exit code for the error: 2 for bad requests, 1 otherwise.
    pub fn code(&self) -> i32 {
        match self {
            CliError::Context(e) if e.is_client_error() => 2,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Registry { path, .. } => {
                eprintln!();
                eprintln!("The registry document lists the services to query.");
                eprintln!("  Expected at: {}", path.display());
                eprintln!("  Change the location with [registry] file in config.ini");
            }
            CliError::Context(ContextError::NoData(_)) => {
                eprintln!();
                eprintln!("No service returned a value for this point.");
                eprintln!("Run 'geocontext check' to see which services are reachable.");
            }
            _ => {}
        }

        process::exit(self.code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Registry { path, error } => {
                write!(f, "Failed to load registry '{}': {}", path.display(), error)
            }
            CliError::Context(e) => write!(f, "{}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::Output(e) => write!(f, "Failed to write output: {}", e),
            CliError::ServicesOffline(count) => {
                write!(f, "{} service(s) failed the health check", count)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Registry { error, .. } => Some(error),
            CliError::Context(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<ContextError> for CliError {
    fn from(e: ContextError) -> Self {
        CliError::Context(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e)
    }
}
