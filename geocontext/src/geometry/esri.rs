//! Esri JSON to GeoJSON conversion.
//!
//! ArcGIS REST services describe polygons as a flat list of rings where
//! clockwise rings are outer boundaries and counter-clockwise rings are
//! holes. GeoJSON groups holes under their outer ring and uses the opposite
//! winding, so rings are reversed while they are grouped.

use geo::Intersects;
use geo_types::{Coord, LineString, Polygon};
use serde::Deserialize;

use super::{GeometryError, Position, Shape};

#[derive(Debug, Deserialize)]
struct EsriGeometry {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    points: Option<Vec<Position>>,
    paths: Option<Vec<Vec<Position>>>,
    rings: Option<Vec<Vec<Position>>>,
}

/// Converts an Esri JSON geometry into a GeoJSON shape.
///
/// * `x`/`y` → `Point` (with `z` when present)
/// * `points` → `MultiPoint`
/// * `paths` → `LineString` for a single path, `MultiLineString` otherwise
/// * `rings` → `Polygon` for a single outer ring, `MultiPolygon` otherwise
pub fn esri_to_shape(raw: &serde_json::Value) -> Result<Shape, GeometryError> {
    let esri = EsriGeometry::deserialize(raw)
        .map_err(|e| GeometryError::Malformed(format!("esri geometry: {}", e)))?;

    if let (Some(x), Some(y)) = (esri.x, esri.y) {
        let mut coordinates = vec![x, y];
        coordinates.extend(esri.z);
        return Ok(Shape::Point { coordinates });
    }

    if let Some(points) = esri.points {
        return Ok(Shape::MultiPoint {
            coordinates: points,
        });
    }

    if let Some(mut paths) = esri.paths {
        return Ok(if paths.len() == 1 {
            Shape::LineString {
                coordinates: paths.remove(0),
            }
        } else {
            Shape::MultiLineString { coordinates: paths }
        });
    }

    if let Some(rings) = esri.rings {
        return rings_to_shape(rings);
    }

    Err(GeometryError::Malformed(
        "esri geometry has no x/y, points, paths or rings".to_string(),
    ))
}

fn close_ring(mut ring: Vec<Position>) -> Vec<Position> {
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            let first = first.clone();
            ring.push(first);
        }
    }
    ring
}

/// Shoelace sign test; collinear rings count as clockwise.
fn is_clockwise(ring: &[Position]) -> bool {
    let total: f64 = ring
        .windows(2)
        .map(|pair| (pair[1][0] - pair[0][0]) * (pair[1][1] + pair[0][1]))
        .sum();
    total >= 0.0
}

fn to_line(ring: &[Position]) -> LineString<f64> {
    LineString(ring.iter().map(|p| Coord { x: p[0], y: p[1] }).collect())
}

fn rings_to_shape(rings: Vec<Vec<Position>>) -> Result<Shape, GeometryError> {
    let mut outers: Vec<Vec<Vec<Position>>> = Vec::new();
    let mut holes: Vec<Vec<Position>> = Vec::new();

    for ring in rings {
        if ring.iter().any(|p| p.len() < 2) {
            return Err(GeometryError::Malformed(
                "ring position with fewer than 2 ordinates".to_string(),
            ));
        }
        let mut ring = close_ring(ring);
        if ring.len() < 4 {
            continue;
        }
        let clockwise = is_clockwise(&ring);
        ring.reverse();
        if clockwise {
            outers.push(vec![ring]);
        } else {
            holes.push(ring);
        }
    }

    for hole in holes {
        let hole_line = to_line(&hole);
        let owner = outers
            .iter()
            .rposition(|polygon| Polygon::new(to_line(&polygon[0]), vec![]).intersects(&hole_line));

        match owner {
            Some(index) => outers[index].push(hole),
            // A hole outside every outer ring is treated as its own polygon
            None => {
                let mut ring = hole;
                ring.reverse();
                outers.push(vec![ring]);
            }
        }
    }

    match outers.len() {
        0 => Err(GeometryError::Malformed(
            "esri polygon has no valid rings".to_string(),
        )),
        1 => Ok(Shape::Polygon {
            coordinates: outers.remove(0),
        }),
        _ => Ok(Shape::MultiPolygon {
            coordinates: outers,
        }),
    }
}
