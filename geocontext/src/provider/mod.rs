//! Context service provider abstraction
//!
//! This module provides the HTTP transport used to reach external context
//! services and one protocol adapter per query type (WMS, WFS, ArcREST and
//! place names). An adapter builds the provider-specific request and turns
//! the provider-specific response into a list of [`Candidate`]s.
//!
//! # Adapter Selection
//!
//! The adapter is chosen once from the service's query type:
//!
//! ```ignore
//! use geocontext::provider::Adapter;
//!
//! let adapter = Adapter::from(service.query_type);
//! let request = adapter.build_request(&service, &point, &search)?;
//! let candidates = adapter.parse_response(&service, &body)?;
//! ```

mod arcrest;
mod features;
mod http;
mod placename;
mod types;
mod wfs;
mod wms;

pub use http::{Connector, HttpResponse, HttpTransport, ReqwestConnector, ReqwestTransport};
pub use types::{render_value, Candidate, ProviderError, RequestDescriptor};

#[cfg(test)]
pub use http::tests::{MockConnector, MockTransport};

use serde_json::Value;

use crate::coord::{BoundingBox, QueryPoint};
use crate::geometry::GeometryFormat;
use crate::registry::{QueryType, ServiceDefinition};

/// Maximum number of features requested from a service.
pub const MAX_FEATURES: u32 = 10;

/// Protocol adapter for one query type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    Wms,
    Wfs,
    ArcRest,
    PlaceName,
}

impl From<QueryType> for Adapter {
    fn from(query_type: QueryType) -> Self {
        match query_type {
            QueryType::Wms => Adapter::Wms,
            QueryType::Wfs => Adapter::Wfs,
            QueryType::ArcRest => Adapter::ArcRest,
            QueryType::PlaceName => Adapter::PlaceName,
        }
    }
}

impl Adapter {
    pub fn query_type(&self) -> QueryType {
        match self {
            Adapter::Wms => QueryType::Wms,
            Adapter::Wfs => QueryType::Wfs,
            Adapter::ArcRest => QueryType::ArcRest,
            Adapter::PlaceName => QueryType::PlaceName,
        }
    }

    /// Encoding of the raw geometries in this adapter's candidates.
    pub fn geometry_format(&self) -> GeometryFormat {
        match self {
            Adapter::ArcRest => GeometryFormat::Esri,
            _ => GeometryFormat::GeoJson,
        }
    }

    /// Builds the first request for a query.
    ///
    /// # Arguments
    ///
    /// * `service` - Service being queried
    /// * `point` - Query point in the service's native SRID
    /// * `search` - Search box around `point`, in the same SRID
    pub fn build_request(
        &self,
        service: &ServiceDefinition,
        point: &QueryPoint,
        search: &BoundingBox,
    ) -> Result<RequestDescriptor, ProviderError> {
        let request = match self {
            Adapter::Wms => wms::build_request(service, point, search)?,
            Adapter::Wfs => wfs::build_request(service, point)?,
            Adapter::ArcRest => arcrest::build_request(service, point, search),
            Adapter::PlaceName => placename::build_request(service, point),
        };

        Ok(match &service.credentials.api_key {
            Some(key) => request.param("key", key),
            None => request,
        })
    }

    /// Builds the retry request used when the first one found no features.
    ///
    /// Only WFS has a fallback: the intersect filter is replaced by a
    /// bounding box of the search tolerance.
    pub fn fallback_request(
        &self,
        previous: &RequestDescriptor,
        search: &BoundingBox,
    ) -> Option<RequestDescriptor> {
        match self {
            Adapter::Wfs => Some(wfs::bbox_request(previous, search)),
            _ => None,
        }
    }

    /// Extracts candidates from a decoded response body.
    pub fn parse_response(
        &self,
        service: &ServiceDefinition,
        body: &Value,
    ) -> Result<Vec<Candidate>, ProviderError> {
        match self {
            Adapter::Wms => wms::parse_response(service, body),
            Adapter::Wfs => wfs::parse_response(service, body),
            Adapter::ArcRest => arcrest::parse_response(service, body),
            Adapter::PlaceName => placename::parse_response(service, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::bbox;
    use crate::registry::Credentials;

    #[test]
    fn test_adapter_from_query_type() {
        for query_type in [
            QueryType::Wms,
            QueryType::Wfs,
            QueryType::ArcRest,
            QueryType::PlaceName,
        ] {
            assert_eq!(Adapter::from(query_type).query_type(), query_type);
        }
    }

    #[test]
    fn test_geometry_format() {
        assert_eq!(Adapter::ArcRest.geometry_format(), GeometryFormat::Esri);
        assert_eq!(Adapter::Wfs.geometry_format(), GeometryFormat::GeoJson);
    }

    #[test]
    fn test_api_key_appended() {
        let service = ServiceDefinition::builder("rain", QueryType::Wms, "http://x/wms")
            .service_version("1.1.1")
            .credentials(Credentials {
                api_key: Some("abc123".to_string()),
                ..Default::default()
            })
            .build()
            .unwrap();
        let point = QueryPoint::wgs84(1.0, 1.0);
        let request = Adapter::Wms
            .build_request(&service, &point, &bbox(&point, 10.0).unwrap())
            .unwrap();
        assert_eq!(request.get("key"), Some("abc123"));
    }

    #[test]
    fn test_only_wfs_has_fallback() {
        let previous = RequestDescriptor::new("http://x").param("FILTER", "f");
        let search = bbox(&QueryPoint::wgs84(1.0, 1.0), 10.0).unwrap();
        assert!(Adapter::Wms.fallback_request(&previous, &search).is_none());
        assert!(Adapter::Wfs.fallback_request(&previous, &search).is_some());
    }
}
