//! Per-service fetch work items.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::CACHE_SRID;
use crate::coord::{bbox, BoundingBox, QueryPoint, TransformError};
use crate::geometry::Geometry;
use crate::provider::{Adapter, ProviderError};
use crate::registry::ServiceDefinition;

/// Lifecycle of a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Not yet dispatched
    Pending,
    /// Response parsed; `value` may still be null
    Resolved,
    /// Network, status, parse or timeout failure
    Failed,
}

/// One lookup against one service.
///
/// Everything the concurrent phase needs is captured at construction; the
/// result slots are filled in by the orchestrator.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub service: Arc<ServiceDefinition>,
    pub adapter: Adapter,
    /// Query point in the service's native SRID
    pub point: QueryPoint,
    /// Query point in the cache SRID
    pub cache_point: QueryPoint,
    /// Search box around `point`, in the service's SRID
    pub bbox: BoundingBox,
    /// Search tolerance in meters
    pub tolerance: f64,

    pub value: Option<String>,
    pub geometry: Option<Geometry>,
    /// URL of the last request sent
    pub source_uri: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: FetchStatus,
    pub error: Option<ProviderError>,
}

impl FetchRequest {
    /// Snapshots a service definition into a pending request.
    ///
    /// # Arguments
    ///
    /// * `service` - Service to query
    /// * `point` - Query point in any supported SRID
    /// * `tolerance` - Search tolerance in meters
    pub fn new(
        service: Arc<ServiceDefinition>,
        point: &QueryPoint,
        tolerance: f64,
    ) -> Result<Self, TransformError> {
        let native = point.transform(service.srid)?;
        let cache_point = point.transform(CACHE_SRID)?;
        let bbox = bbox(&native, tolerance)?;

        Ok(Self {
            adapter: Adapter::from(service.query_type),
            service,
            point: native,
            cache_point,
            bbox,
            tolerance,
            value: None,
            geometry: None,
            source_uri: None,
            expires_at: None,
            status: FetchStatus::Pending,
            error: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.service.key
    }

    pub fn is_resolved(&self) -> bool {
        self.status == FetchStatus::Resolved
    }

    /// Records a parsed result.
    pub(crate) fn resolve(&mut self, value: Option<String>, geometry: Option<Geometry>) {
        self.value = value;
        self.geometry = geometry;
        self.status = FetchStatus::Resolved;
        self.error = None;
        self.stamp_expiry();
    }

    /// Records a failure; the value slot is cleared.
    pub(crate) fn fail(&mut self, error: ProviderError) {
        self.value = None;
        self.geometry = None;
        self.status = FetchStatus::Failed;
        self.error = Some(error);
        self.stamp_expiry();
    }

    fn stamp_expiry(&mut self) {
        let ttl = chrono::Duration::from_std(self.service.cache_duration)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));
        self.expires_at = Some(Utc::now() + ttl);
    }
}

/// A fetch request carrying the caller's re-assembly tag.
///
/// Results come back from a batch in input order; the tag tells the caller
/// where each one belongs without relying on positions.
#[derive(Debug, Clone)]
pub struct TaggedRequest<T> {
    pub tag: T,
    pub request: FetchRequest,
}

impl<T> TaggedRequest<T> {
    pub fn new(tag: T, request: FetchRequest) -> Self {
        Self { tag, request }
    }
}
