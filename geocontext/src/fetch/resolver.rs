//! Nearest-feature selection.
//!
//! A response may hold several features. The one whose geometry lies
//! closest to the query point wins; candidates whose geometry cannot be
//! decoded are ignored.

use serde_json::Value;
use tracing::{debug, warn};

use crate::coord::{QueryPoint, Srid};
use crate::geometry::{Geometry, GeometryError, GeometryFormat};
use crate::provider::Candidate;

/// The selected value and its decoded geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub value: Option<String>,
    pub geometry: Option<Geometry>,
}

/// Picks the candidate nearest to `point`.
///
/// The first candidate's value is the default. Each geometry is decoded and
/// measured; a strictly smaller distance replaces the current choice, so
/// ties keep the earliest candidate. Geometries above `offload_threshold`
/// ordinates are decoded on the blocking thread pool.
///
/// Returns `None` for an empty candidate list.
///
/// # Arguments
///
/// * `candidates` - Candidates in response order
/// * `point` - Query point
/// * `format` - Encoding of the raw geometries
/// * `srid` - SRID of the raw geometries
/// * `offload_threshold` - Ordinate count above which decoding is offloaded
pub async fn resolve_nearest(
    candidates: Vec<Candidate>,
    point: QueryPoint,
    format: GeometryFormat,
    srid: Srid,
    offload_threshold: usize,
) -> Option<Resolution> {
    let first = candidates.first()?;
    let mut best = Resolution {
        value: first.value.clone(),
        geometry: None,
    };
    let mut best_distance: Option<f64> = None;

    for (index, candidate) in candidates.into_iter().enumerate() {
        let Some(raw) = candidate.geometry else {
            continue;
        };

        let measured = if raw_ordinate_count(&raw) > offload_threshold {
            match tokio::task::spawn_blocking(move || measure(&raw, format, srid, &point)).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(candidate = index, error = %e, "Geometry worker failed");
                    continue;
                }
            }
        } else {
            measure(&raw, format, srid, &point)
        };

        match measured {
            Ok((geometry, distance)) => {
                if best_distance.map_or(true, |d| distance < d) {
                    best = Resolution {
                        value: candidate.value,
                        geometry: Some(geometry),
                    };
                    best_distance = Some(distance);
                }
            }
            Err(e) => {
                debug!(candidate = index, error = %e, "Skipping candidate geometry");
            }
        }
    }

    Some(best)
}

fn measure(
    raw: &Value,
    format: GeometryFormat,
    srid: Srid,
    point: &QueryPoint,
) -> Result<(Geometry, f64), GeometryError> {
    let geometry = Geometry::parse(raw, format, srid)?;
    let distance = geometry.distance_to(point)?;
    Ok((geometry, distance))
}

/// Approximate number of ordinates in a raw geometry payload.
///
/// Numbers are counted directly; geometry embedded as JSON text is
/// estimated from its separators so it need not be decoded twice.
pub fn raw_ordinate_count(raw: &Value) -> usize {
    match raw {
        Value::String(text) => text.bytes().filter(|b| *b == b',').count() + 1,
        other => count_numbers(other),
    }
}

fn count_numbers(value: &Value) -> usize {
    match value {
        Value::Number(_) => 1,
        Value::Array(items) => items.iter().map(count_numbers).sum(),
        Value::Object(members) => members.values().map(count_numbers).sum(),
        _ => 0,
    }
}
