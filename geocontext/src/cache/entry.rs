//! Cached context values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coord::QueryPoint;
use crate::fetch::FetchRequest;
use crate::geometry::Geometry;
use crate::registry::ServiceDefinition;

/// One stored result of a service lookup.
///
/// Geometry is always 2D and in the cache SRID. Entries are never modified
/// after insertion; they stop being served once `expires_at` has passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Store-assigned id, `None` until inserted
    pub id: Option<u64>,
    pub service_key: String,
    /// Display name of the service
    pub name: String,
    /// Request that produced the value
    pub source_uri: Option<String>,
    pub geometry: Geometry,
    /// `None` when the service had no value at this location
    pub value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Null entry at the query point, used when a result could not be
    /// written. It is never stored.
    pub fn unresolved(request: &FetchRequest) -> Self {
        let now = Utc::now();
        Self {
            source_uri: request.source_uri.clone(),
            expires_at: request.expires_at.unwrap_or(now),
            ..Self::unavailable(&request.service, &request.cache_point)
        }
    }

    /// Null entry for a service that could not be queried at all, e.g. when
    /// the point cannot be projected into its SRID. It is never stored.
    pub fn unavailable(service: &ServiceDefinition, cache_point: &QueryPoint) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            service_key: service.key.clone(),
            name: service.name.clone(),
            source_uri: None,
            geometry: Geometry::from_point(cache_point),
            value: None,
            created_at: now,
            expires_at: now,
        }
    }
}
