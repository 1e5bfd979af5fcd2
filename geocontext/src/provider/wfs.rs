//! OGC Web Feature Service adapter.
//!
//! The first request asks for features intersecting the query point with an
//! inline GML filter. Points outside every polygon (or layers that are not
//! polygonal) return nothing, in which case a second request replaces the
//! filter with a bounding box of the search tolerance.

use serde_json::Value;

use super::features::{candidates, member_array};
use super::types::{Candidate, ProviderError, RequestDescriptor};
use super::MAX_FEATURES;
use crate::coord::{BboxOrder, BoundingBox, QueryPoint};
use crate::registry::{QueryType, ServiceDefinition};

/// Geometry column used by the intersect filter.
const GEOMETRY_PROPERTY: &str = "geom";

fn intersects_filter(point: &QueryPoint) -> String {
    format!(
        concat!(
            r#"<Filter xmlns="http://www.opengis.net/ogc" xmlns:gml="http://www.opengis.net/gml">"#,
            "<Intersects><PropertyName>{}</PropertyName>",
            r#"<gml:Point srsName="{}"><gml:coordinates>{},{}</gml:coordinates></gml:Point>"#,
            "</Intersects></Filter>"
        ),
        GEOMETRY_PROPERTY,
        point.srid.epsg(),
        point.x,
        point.y
    )
}

pub(super) fn build_request(
    service: &ServiceDefinition,
    point: &QueryPoint,
) -> Result<RequestDescriptor, ProviderError> {
    let version = service.service_version.as_str();
    let limit_param = match version {
        "1.0.0" | "1.1.0" | "1.3.0" => "maxFeatures",
        "2.0.0" => "count",
        _ => {
            return Err(ProviderError::UnsupportedVersion {
                query_type: QueryType::Wfs,
                version: version.to_string(),
            })
        }
    };

    Ok(RequestDescriptor::new(&service.url)
        .param("SERVICE", "WFS")
        .param("REQUEST", "GetFeature")
        .param("VERSION", version)
        .param("OUTPUTFORMAT", "application/json")
        .param("TYPENAME", &service.layer_typename)
        .param("PROPERTYNAME", format!("({})", service.layer_name))
        .param("FILTER", intersects_filter(point))
        .param(limit_param, MAX_FEATURES))
}

/// Turns an intersect request into a bounding-box request.
pub(super) fn bbox_request(previous: &RequestDescriptor, search: &BoundingBox) -> RequestDescriptor {
    let mut request = previous.clone();
    request.remove("FILTER");
    request.set("BBOX", search.to_param(BboxOrder::XY));
    request.set("SRSNAME", search.srid.epsg());
    request
}

pub(super) fn parse_response(
    service: &ServiceDefinition,
    body: &Value,
) -> Result<Vec<Candidate>, ProviderError> {
    let features = member_array(body, "features")?;
    candidates(features, &service.layer_name, true)
}
