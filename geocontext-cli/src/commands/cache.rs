//! Cache management CLI commands.

use std::path::Path;

use clap::Subcommand;
use tracing::info;

use geocontext::cache::{CacheStats, CacheStore};

use crate::error::CliError;
use crate::runner::{load_store, CliRunner};

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show cache snapshot statistics
    Stats,
    /// Remove expired entries from the cache snapshot
    Purge,
    /// Delete the cache snapshot, removing all cached values
    Clear,
}

/// Run a cache subcommand.
pub async fn run(runner: &CliRunner, action: CacheAction) -> Result<(), CliError> {
    let snapshot = &runner.config().cache.snapshot;

    match action {
        CacheAction::Stats => {
            let stats = stats(snapshot).await?;
            println!("Cache snapshot: {}", snapshot.display());
            println!("  Entries: {}", stats.entries);
        }
        CacheAction::Purge => {
            let (removed, remaining) = purge(snapshot).await?;
            info!(removed, remaining, "Cache purged");
            println!("Cache snapshot now holds {} unexpired entries", remaining);
        }
        CacheAction::Clear => {
            if snapshot.exists() {
                std::fs::remove_file(snapshot)
                    .map_err(|e| CliError::Cache(e.into()))?;
                println!("Deleted cache snapshot: {}", snapshot.display());
            } else {
                println!("No cache snapshot at: {}", snapshot.display());
            }
        }
    }
    Ok(())
}

async fn stats(snapshot: &Path) -> Result<CacheStats, CliError> {
    let store = load_store(snapshot).await?;
    Ok(store.stats())
}

/// Returns the number of entries removed and kept.
async fn purge(snapshot: &Path) -> Result<(usize, usize), CliError> {
    let store = load_store(snapshot).await?;
    let removed = store.purge_expired().await?;
    let remaining = store.save_snapshot(snapshot).await?;
    Ok((removed, remaining))
}
