//! Search bounding boxes around a query point.
//!
//! A box is built by walking `distance` meters from the point along the four
//! cardinal bearings on the WGS84 sphere, then reprojecting the corners back
//! into the point's own reference system.

use std::fmt;

use super::{transform_xy, QueryPoint, Srid, TransformError, MAX_LON, MIN_LON};

/// Smallest WGS84 radius of curvature (meridian at the equator).
///
/// Destinations computed on this sphere are never closer than the requested
/// distance on the ellipsoid.
const MIN_RADIUS_OF_CURVATURE_M: f64 = 6_335_439.0;

/// Axis order of a formatted bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BboxOrder {
    /// `minX,minY,maxX,maxY` (longitude first)
    #[default]
    XY,
    /// `minY,minX,maxY,maxX` (latitude first, e.g. WFS 1.1 in EPSG:4326)
    YX,
}

/// Axis-aligned box in the reference system of the point it was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub srid: Srid,
}

impl BoundingBox {
    /// Formats the box as the comma-joined parameter OGC services expect.
    pub fn to_param(&self, order: BboxOrder) -> String {
        let values = match order {
            BboxOrder::XY => [self.min_x, self.min_y, self.max_x, self.max_y],
            BboxOrder::YX => [self.min_y, self.min_x, self.max_y, self.max_x],
        };
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Returns true if the point lies inside or on the box.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_param(BboxOrder::XY))
    }
}

/// Great-circle destination from `(lon, lat)` along `bearing_deg` for
/// `distance_m` meters.
///
/// Returns `(lon, lat)` in degrees with longitude normalized to -180..180.
pub fn destination(lon: f64, lat: f64, bearing_deg: f64, distance_m: f64) -> (f64, f64) {
    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let bearing = bearing_deg.to_radians();
    let angular_distance = distance_m / MIN_RADIUS_OF_CURVATURE_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_d = angular_distance.sin();
    let cos_d = angular_distance.cos();

    let lat2 = (sin_lat1 * cos_d + cos_lat1 * sin_d * bearing.cos()).asin();
    let lon2 = lon1 + (bearing.sin() * sin_d * cos_lat1).atan2(cos_d - sin_lat1 * lat2.sin());

    let mut lon2 = lon2.to_degrees();
    if lon2 > 180.0 {
        lon2 -= 360.0;
    } else if lon2 < -180.0 {
        lon2 += 360.0;
    }

    (lon2, lat2.to_degrees())
}

/// Builds a box extending at least `min_distance_m` from `point` in each
/// cardinal direction.
///
/// Corners are further away than `min_distance_m`; the cardinal distances
/// equal it.
pub fn bbox(point: &QueryPoint, min_distance_m: f64) -> Result<BoundingBox, TransformError> {
    let origin = point.transform(Srid::WGS84)?;

    let (_, north) = destination(origin.x, origin.y, 0.0, min_distance_m);
    let (east, _) = destination(origin.x, origin.y, 90.0, min_distance_m);
    let (_, south) = destination(origin.x, origin.y, 180.0, min_distance_m);
    let (west, _) = destination(origin.x, origin.y, 270.0, min_distance_m);

    // Destinations across the antimeridian wrap around; stop at the edge
    let east = if east < origin.x { MAX_LON } else { east };
    let west = if west > origin.x { MIN_LON } else { west };

    let (min_x, min_y) = transform_xy(west, south, Srid::WGS84, point.srid)?;
    let (max_x, max_y) = transform_xy(east, north, Srid::WGS84, point.srid)?;

    Ok(BoundingBox {
        min_x,
        min_y,
        max_x,
        max_y,
        srid: point.srid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse_param(param: &str) -> Vec<f64> {
        param.split(',').map(|v| v.parse().unwrap()).collect()
    }

    #[test]
    fn test_bbox_is_ordered_north_east() {
        let point = QueryPoint::wgs84(1.0, 10.0);
        let values = parse_param(&bbox(&point, 10.0).unwrap().to_param(BboxOrder::XY));
        assert!(values[0] < values[2]);
        assert!(values[1] < values[3]);
    }

    #[test]
    fn test_bbox_is_ordered_south_west() {
        let point = QueryPoint::wgs84(-1.0, -10.0);
        let values = parse_param(&bbox(&point, 10.0).unwrap().to_param(BboxOrder::XY));
        assert!(values[0] < values[2]);
        assert!(values[1] < values[3]);
    }

    #[test]
    fn test_bbox_contains_point() {
        let point = QueryPoint::wgs84(27.8, -32.1);
        let b = bbox(&point, 10.0).unwrap();
        assert!(b.contains(point.x, point.y));
    }

    #[test]
    fn test_bbox_latlon_order_swaps_axes() {
        let point = QueryPoint::wgs84(27.8, -32.1);
        let b = bbox(&point, 100.0).unwrap();
        let xy = parse_param(&b.to_param(BboxOrder::XY));
        let yx = parse_param(&b.to_param(BboxOrder::YX));
        assert_eq!(xy[0], yx[1]);
        assert_eq!(xy[1], yx[0]);
        assert_eq!(xy[2], yx[3]);
        assert_eq!(xy[3], yx[2]);
    }

    #[test]
    fn test_bbox_extends_at_least_distance() {
        // One meter of latitude is roughly 1/111_320 degree
        let point = QueryPoint::wgs84(0.0, 0.0);
        let b = bbox(&point, 1000.0).unwrap();
        assert!(b.max_y >= 1000.0 / 111_320.0);
        assert!(b.min_y <= -1000.0 / 111_320.0);
    }

    #[test]
    fn test_bbox_in_web_mercator() {
        let point = QueryPoint::wgs84(27.8, -32.1)
            .transform(Srid::WEB_MERCATOR)
            .unwrap();
        let b = bbox(&point, 10.0).unwrap();
        assert_eq!(b.srid, Srid::WEB_MERCATOR);
        assert!(b.contains(point.x, point.y));
        // Mercator scale factor only grows away from the equator
        assert!(b.max_x - point.x >= 10.0);
        assert!(point.y - b.min_y >= 10.0);
    }

    #[test]
    fn test_destination_north() {
        let (lon, lat) = destination(0.0, 0.0, 0.0, 111_000.0);
        assert!(lon.abs() < 1e-9);
        assert!((lat - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_bbox_clamped_at_antimeridian() {
        let east = bbox(&QueryPoint::wgs84(179.99995, 0.0), 10.0).unwrap();
        assert!(east.min_x < east.max_x);
        assert_eq!(east.max_x, MAX_LON);
        assert!(east.contains(179.99995, 0.0));

        let west = bbox(&QueryPoint::wgs84(-179.99995, 0.0), 10.0).unwrap();
        assert!(west.min_x < west.max_x);
        assert_eq!(west.min_x, MIN_LON);
    }

    #[test]
    fn test_destination_wraps_antimeridian() {
        let (lon, _) = destination(179.9999, 0.0, 90.0, 1000.0);
        assert!(lon < 0.0);
    }

    proptest! {
        #[test]
        fn prop_bbox_always_ordered(
            lon in -179.0f64..179.0,
            lat in -80.0f64..80.0,
            distance in 0.5f64..5000.0,
        ) {
            let b = bbox(&QueryPoint::wgs84(lon, lat), distance).unwrap();
            prop_assert!(b.min_x < b.max_x);
            prop_assert!(b.min_y < b.max_y);
        }
    }
}
