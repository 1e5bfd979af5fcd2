//! CLI runner for common setup and operations.
//!
//! Loads the application config, initializes logging, and assembles the
//! context service with a cache restored from the last run.

use std::path::Path;

use tracing::{debug, info};

use geocontext::cache::{CacheStore, MemoryCacheStore, SpatialCache};
use geocontext::config::ConfigFile;
use geocontext::context::ContextService;
use geocontext::fetch::FetchOrchestrator;
use geocontext::logging::{init_logging, LoggingGuard};
use geocontext::provider::ReqwestConnector;
use geocontext::registry::{load_registry, InMemoryConfigStore};

use crate::error::CliError;

/// Context service as assembled by the CLI.
pub type CliContext = ContextService<InMemoryConfigStore, ReqwestConnector>;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Load config and initialize logging.
    ///
    /// Console logging goes to stderr and is only enabled when stderr is a
    /// terminal, unless `quiet` is set.
    pub fn new(quiet: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let console = !quiet && atty::is(atty::Stream::Stderr);
        let logging_guard = init_logging(&config.logging.file, console)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("GeoContext v{}", geocontext::VERSION);
        info!("GeoContext CLI: {} command", command);
    }

    /// Assemble the context service, restoring the cache snapshot.
    pub async fn context(&self) -> Result<CliContext, CliError> {
        let path = &self.config.registry.file;
        let registry = load_registry(path).map_err(|error| CliError::Registry {
            path: path.clone(),
            error,
        })?;

        let store = load_store(&self.config.cache.snapshot).await?;
        let cache = SpatialCache::new(store, &self.config.cache);
        let orchestrator = FetchOrchestrator::new(ReqwestConnector, self.config.fetch.clone());

        Ok(ContextService::new(registry, cache, orchestrator))
    }

    /// Write the cache back to its snapshot file.
    pub async fn persist(&self, context: &CliContext) -> Result<(), CliError> {
        let store = context.cache().store();
        let written = store.save_snapshot(&self.config.cache.snapshot).await?;
        debug!(entries = written, stats = %store.stats(), "Cache snapshot saved");
        Ok(())
    }
}

/// Create a store and fill it from a snapshot, if one exists.
pub async fn load_store(snapshot: &Path) -> Result<MemoryCacheStore, CliError> {
    let store = MemoryCacheStore::new();
    let loaded = store.load_snapshot(snapshot).await?;
    debug!(entries = loaded, path = %snapshot.display(), "Cache snapshot loaded");
    Ok(store)
}
