//! Spatial cache of context values.
//!
//! Results are stored per service with their geometry in Web Mercator and an
//! expiry time. A lookup is a hit when an unexpired entry for the service
//! lies within the search distance of the query point, so nearby queries
//! share one entry.
//!
//! # Example
//!
//! ```ignore
//! use geocontext::cache::{MemoryCacheStore, SpatialCache};
//!
//! let cache = SpatialCache::new(MemoryCacheStore::new(), &config.cache);
//! if let Some(entry) = cache.retrieve("rainfall", &point, 10.0).await? {
//!     println!("{:?}", entry.value);
//! }
//! ```

mod entry;
mod memory;
mod spatial;
mod traits;

pub use entry::CacheEntry;
pub use memory::MemoryCacheStore;
pub use spatial::SpatialCache;
pub use traits::{BoxFuture, CacheError, CacheStats, CacheStore};

use crate::coord::Srid;

/// Reference system of stored geometries.
pub const CACHE_SRID: Srid = Srid::WEB_MERCATOR;
