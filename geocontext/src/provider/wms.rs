//! OGC Web Map Service adapter.
//!
//! Values are read with `GetFeatureInfo` against a 101×101 pixel map
//! centred on the query point, asking for the centre pixel. WMS feature
//! info carries no usable geometry.
//!
//! | Version             | Request          | Reference | Pixel   |
//! |---------------------|------------------|-----------|---------|
//! | 1.0.0, 1.1.0, 1.1.1 | `feature_info`   | `SRS`     | `X`/`Y` |
//! | 1.3.0               | `GetFeatureInfo` | `CRS`     | `I`/`J` |

use serde_json::Value;

use super::features::{candidates, member_array};
use super::types::{Candidate, ProviderError, RequestDescriptor};
use super::MAX_FEATURES;
use crate::coord::{BboxOrder, BoundingBox, QueryPoint, Srid};
use crate::registry::{QueryType, ServiceDefinition};

const MAP_SIZE_PX: u32 = 101;
const CENTRE_PX: u32 = 50;

pub(super) fn build_request(
    service: &ServiceDefinition,
    point: &QueryPoint,
    search: &BoundingBox,
) -> Result<RequestDescriptor, ProviderError> {
    let version = service.service_version.as_str();
    let legacy = match version {
        "1.0.0" | "1.1.0" | "1.1.1" => true,
        "1.3.0" => false,
        _ => {
            return Err(ProviderError::UnsupportedVersion {
                query_type: QueryType::Wms,
                version: version.to_string(),
            })
        }
    };

    // WMS 1.3.0 follows the EPSG axis order, latitude first for 4326
    let order = if !legacy && point.srid.canonical() == Srid::WGS84 {
        BboxOrder::YX
    } else {
        BboxOrder::XY
    };
    let bbox = search.to_param(order);

    let request = RequestDescriptor::new(&service.url)
        .param("SERVICE", "WMS")
        .param("VERSION", version)
        .param("REQUEST", if legacy { "feature_info" } else { "GetFeatureInfo" })
        .param("INFO_FORMAT", "application/json")
        .param("LAYERS", &service.layer_typename)
        .param("QUERY_LAYERS", &service.layer_typename)
        .param("FEATURE_COUNT", MAX_FEATURES)
        .param(if legacy { "SRS" } else { "CRS" }, point.srid.epsg())
        .param("BBOX", bbox)
        .param("WIDTH", MAP_SIZE_PX)
        .param("HEIGHT", MAP_SIZE_PX);

    Ok(if legacy {
        request.param("X", CENTRE_PX).param("Y", CENTRE_PX)
    } else {
        request.param("I", CENTRE_PX).param("J", CENTRE_PX)
    })
}

pub(super) fn parse_response(
    service: &ServiceDefinition,
    body: &Value,
) -> Result<Vec<Candidate>, ProviderError> {
    let features = member_array(body, "features")?;
    candidates(features, &service.layer_name, false)
}
