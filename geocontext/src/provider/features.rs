//! Candidate extraction from feature lists.

use serde_json::Value;
use tracing::debug;

use super::types::{render_value, Candidate, ProviderError};

/// Returns the array stored under `member`.
pub(super) fn member_array<'a>(body: &'a Value, member: &str) -> Result<&'a [Value], ProviderError> {
    body.get(member)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| ProviderError::MissingField(member.to_string()))
}

/// Looks up `field` on a feature.
///
/// GeoJSON features carry attributes under `properties`, Esri identify
/// results under `attributes`; plain records (e.g. place names) at the top
/// level.
fn feature_value<'a>(feature: &'a Value, field: &str) -> Option<&'a Value> {
    if let Some(properties) = feature.get("properties").filter(|p| p.is_object()) {
        return properties.get(field);
    }
    feature
        .get(field)
        .or_else(|| feature.get("attributes").and_then(|a| a.get(field)))
}

/// Builds candidates from a feature list.
///
/// Features without the value field are skipped; features without a
/// geometry are kept with `geometry: None`.
///
/// # Errors
///
/// `ProviderError::NoFeatures` when no feature yields a candidate.
pub(super) fn candidates(
    features: &[Value],
    field: &str,
    with_geometry: bool,
) -> Result<Vec<Candidate>, ProviderError> {
    let mut found = Vec::with_capacity(features.len());
    for feature in features {
        let Some(value) = feature_value(feature, field) else {
            debug!(field, "Feature has no value field, skipping");
            continue;
        };

        let geometry = if with_geometry {
            feature.get("geometry").filter(|g| !g.is_null()).cloned()
        } else {
            None
        };
        found.push(Candidate::new(render_value(value), geometry));
    }

    if found.is_empty() {
        return Err(ProviderError::NoFeatures);
    }
    Ok(found)
}
