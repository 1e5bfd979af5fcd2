//! Storage interface for the spatial cache.
//!
//! A [`CacheStore`] answers "nearest unexpired entry for this service within
//! this distance" and appends new entries. Methods return boxed futures so
//! stores can be used as trait objects.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use super::entry::CacheEntry;
use crate::coord::QueryPoint;
use crate::geometry::GeometryError;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error while reading or writing a snapshot.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Result geometry could not be stored.
    #[error("Geometry for {service} not storable: {source}")]
    Geometry {
        service: String,
        #[source]
        source: GeometryError,
    },

    /// Backend specific failure.
    #[error("Store error: {0}")]
    Store(String),
}

/// Counters for one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} hits, {} misses ({:.1}% hit rate), {} inserts",
            self.entries,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.inserts
        )
    }
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Spatial store of cache entries.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`.
pub trait CacheStore: Send + Sync {
    /// Nearest entry for a service.
    ///
    /// # Arguments
    ///
    /// * `service_key` - Service whose entries are searched
    /// * `point` - Query point in the cache SRID
    /// * `distance` - Maximum distance from `point`, in cache SRID units
    ///
    /// # Returns
    ///
    /// - `Ok(Some(entry))` for the closest unexpired entry within `distance`
    /// - `Ok(None)` if there is none
    fn find(
        &self,
        service_key: &str,
        point: &QueryPoint,
        distance: f64,
    ) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>>;

    /// Appends an entry and returns it with its assigned id.
    fn insert(&self, entry: CacheEntry) -> BoxFuture<'_, Result<CacheEntry, CacheError>>;

    /// Removes expired entries, returning how many were dropped.
    fn purge_expired(&self) -> BoxFuture<'_, Result<usize, CacheError>>;

    /// Number of stored entries, expired ones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_display() {
        let stats = CacheStats {
            entries: 3,
            hits: 3,
            misses: 1,
            inserts: 4,
        };
        let display = format!("{}", stats);
        assert!(display.contains("3 entries"));
        assert!(display.contains("75.0% hit rate"));
    }

    #[test]
    fn test_hit_rate_without_lookups() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_cache_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cache_err: CacheError = io_err.into();
        assert!(matches!(cache_err, CacheError::Io(_)));
    }
}
