//! Coordinate conversion module
//!
//! Provides reprojection between geographic WGS84 coordinates and spherical
//! (Web) Mercator, search bounding boxes around a query point, and parsing of
//! user supplied decimal or degree/minute/second coordinates.

mod bbox;
mod dms;
mod types;

pub use bbox::{bbox, destination, BboxOrder, BoundingBox};
pub use dms::{dms_to_decimal, parse_coordinate, parse_dms};
pub use types::{ParseError, QueryPoint, Srid, TransformError, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

use std::f64::consts::PI;

/// WGS84 semi-major axis in meters, the sphere radius of Web Mercator.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Reprojects an (x, y) pair from `from` to `to`.
///
/// Returns the input unchanged when both references are the same (after
/// alias resolution). Only WGS84 ↔ Web Mercator is supported.
pub fn transform_xy(x: f64, y: f64, from: Srid, to: Srid) -> Result<(f64, f64), TransformError> {
    let (source, target) = (from.canonical(), to.canonical());
    if source == target {
        return Ok((x, y));
    }

    match (source, target) {
        (Srid::WGS84, Srid::WEB_MERCATOR) => to_web_mercator(x, y),
        (Srid::WEB_MERCATOR, Srid::WGS84) => Ok(from_web_mercator(x, y)),
        _ => Err(TransformError::Unsupported { from, to }),
    }
}

/// Converts longitude/latitude degrees to Web Mercator meters.
#[inline]
pub fn to_web_mercator(lon: f64, lat: f64) -> Result<(f64, f64), TransformError> {
    if !(-90.0..=90.0).contains(&lat) || !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(TransformError::OutOfRange {
            x: lon,
            y: lat,
            srid: Srid::WGS84,
        });
    }

    // Poles project to infinity, clamp to the Mercator limit
    let lat = lat.clamp(MIN_LAT, MAX_LAT);

    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    Ok((x, y))
}

/// Converts Web Mercator meters to longitude/latitude degrees.
#[inline]
pub fn from_web_mercator(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}
