//! ArcGIS REST `identify` adapter.
//!
//! The query point is sent as an inline `{x: .., y: ..}` geometry together
//! with a map extent built from the search tolerance. Results carry Esri
//! JSON geometries which are converted to GeoJSON by the resolver.
//!
//! # URL Pattern
//!
//! `{url}identify?f=json&geometryType=esriGeometryPoint&geometry={x: X, y: Y}&...`

use serde_json::Value;

use super::features::{candidates, member_array};
use super::types::{Candidate, ProviderError, RequestDescriptor};
use super::MAX_FEATURES;
use crate::coord::{BboxOrder, BoundingBox, QueryPoint};
use crate::registry::ServiceDefinition;

/// Identify operation appended to the map service URL.
const IDENTIFY: &str = "identify";

fn identify_url(base: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, IDENTIFY)
    } else {
        format!("{}/{}", base, IDENTIFY)
    }
}

pub(super) fn build_request(
    service: &ServiceDefinition,
    point: &QueryPoint,
    search: &BoundingBox,
) -> RequestDescriptor {
    RequestDescriptor::new(identify_url(&service.url))
        .param("f", "json")
        .param("geometryType", "esriGeometryPoint")
        .param("geometry", format!("{{x: {}, y: {}}}", point.x, point.y))
        .param("sr", point.srid.code())
        .param("layers", &service.layer_typename)
        .param("imageDisplay", "100,100,96")
        .param("tolerance", 1)
        .param("mapExtent", search.to_param(BboxOrder::XY))
        .param("returnGeometry", "true")
        .param("maxRecordCount", MAX_FEATURES)
}

pub(super) fn parse_response(
    service: &ServiceDefinition,
    body: &Value,
) -> Result<Vec<Candidate>, ProviderError> {
    // ArcGIS reports failures as 200 responses with an error member
    if let Some(error) = body.get("error") {
        return Err(ProviderError::InvalidResponse(error.to_string()));
    }
    let results = member_array(body, "results")?;
    candidates(results, &service.layer_name, true)
}
