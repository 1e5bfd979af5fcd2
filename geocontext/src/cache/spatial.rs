//! Distance-bounded cache lookups and writes.

use chrono::Utc;
use tracing::{debug, trace};

use super::entry::CacheEntry;
use super::traits::{CacheError, CacheStore};
use super::CACHE_SRID;
use crate::config::CacheSettings;
use crate::coord::QueryPoint;
use crate::fetch::FetchRequest;
use crate::geometry::{Geometry, GeometryError};

/// Spatial cache over a [`CacheStore`].
///
/// Lookups reproject the query point into the cache SRID and return the
/// nearest unexpired entry within the search distance. Writes store 2D
/// geometry in the cache SRID.
pub struct SpatialCache<S: CacheStore> {
    store: S,
    cache_null_values: bool,
}

impl<S: CacheStore> SpatialCache<S> {
    pub fn new(store: S, settings: &CacheSettings) -> Self {
        Self {
            store,
            cache_null_values: settings.cache_null_values,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn caches_null_values(&self) -> bool {
        self.cache_null_values
    }

    /// Nearest valid entry for `service_key` within `distance` meters.
    pub async fn retrieve(
        &self,
        service_key: &str,
        point: &QueryPoint,
        distance: f64,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let point = point.transform(CACHE_SRID).map_err(|e| CacheError::Geometry {
            service: service_key.to_string(),
            source: GeometryError::from(e),
        })?;
        let found = self.store.find(service_key, &point, distance.max(0.0)).await?;
        trace!(service = service_key, hit = found.is_some(), "Cache lookup");
        Ok(found)
    }

    /// Stores the result of a fetch.
    ///
    /// The geometry falls back to the query point when none was resolved.
    /// Null values are only stored when the cache is configured to keep
    /// them; otherwise the entry is returned without an id.
    pub async fn create(&self, request: &FetchRequest) -> Result<CacheEntry, CacheError> {
        let entry = Self::entry_for(request)?;

        if entry.value.is_none() && !self.cache_null_values {
            debug!(service = %entry.service_key, "Not caching null value");
            return Ok(entry);
        }
        self.store.insert(entry).await
    }

    fn entry_for(request: &FetchRequest) -> Result<CacheEntry, CacheError> {
        let key = &request.service.key;
        let geometry_error = |source: GeometryError| CacheError::Geometry {
            service: key.clone(),
            source,
        };

        let geometry = match &request.geometry {
            Some(geometry) => geometry.transform(CACHE_SRID).map_err(geometry_error)?,
            None => Geometry::from_point(&request.cache_point),
        };
        let geometry = geometry.flatten().map_err(geometry_error)?;

        let now = Utc::now();
        let ttl = chrono::Duration::from_std(request.service.cache_duration)
            .map_err(|e| CacheError::Store(format!("cache duration of {}: {}", key, e)))?;

        Ok(CacheEntry {
            id: None,
            service_key: key.clone(),
            name: request.service.name.clone(),
            source_uri: request.source_uri.clone(),
            geometry,
            value: request.value.clone(),
            created_at: now,
            expires_at: request.expires_at.unwrap_or(now + ttl),
        })
    }
}
