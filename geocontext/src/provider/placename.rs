//! GeoNames-style place name adapter.

use serde_json::Value;

use super::features::{candidates, member_array};
use super::types::{Candidate, ProviderError, RequestDescriptor};
use crate::coord::QueryPoint;
use crate::registry::ServiceDefinition;

pub(super) fn build_request(service: &ServiceDefinition, point: &QueryPoint) -> RequestDescriptor {
    RequestDescriptor::new(&service.url)
        .param("lat", point.y)
        .param("lng", point.x)
        .param(
            "username",
            service.credentials.username.as_deref().unwrap_or_default(),
        )
}

pub(super) fn parse_response(
    service: &ServiceDefinition,
    body: &Value,
) -> Result<Vec<Candidate>, ProviderError> {
    let places = member_array(body, "geonames")?;
    candidates(places, &service.layer_name, false)
}
