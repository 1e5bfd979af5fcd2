//! Coordinate type definitions

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Spatial reference identifier (EPSG code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Srid(pub u32);

impl Srid {
    /// Geographic WGS84 longitude/latitude.
    pub const WGS84: Srid = Srid(4326);

    /// Spherical (Web) Mercator in meters.
    pub const WEB_MERCATOR: Srid = Srid(3857);

    /// Legacy Google code for Web Mercator.
    pub const GOOGLE_MERCATOR: Srid = Srid(900913);

    /// Returns the canonical code for aliases (900913 → 3857).
    pub fn canonical(self) -> Srid {
        if self == Self::GOOGLE_MERCATOR {
            Self::WEB_MERCATOR
        } else {
            self
        }
    }

    /// True for references [`transform_xy`](super::transform_xy) can
    /// reproject: WGS84 and Web Mercator, including its alias.
    pub fn is_supported(self) -> bool {
        matches!(self.canonical(), Self::WGS84 | Self::WEB_MERCATOR)
    }

    /// Returns the raw EPSG code.
    pub fn code(self) -> u32 {
        self.0
    }

    /// Formats the SRID as an OGC `EPSG:<code>` identifier.
    pub fn epsg(self) -> String {
        format!("EPSG:{}", self.0)
    }
}

impl Default for Srid {
    fn default() -> Self {
        Self::WGS84
    }
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Srid {
    fn from(code: u32) -> Self {
        Srid(code)
    }
}

/// A 2D query coordinate with its spatial reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryPoint {
    /// X ordinate (longitude or easting)
    pub x: f64,
    /// Y ordinate (latitude or northing)
    pub y: f64,
    /// Spatial reference of the ordinates
    pub srid: Srid,
}

impl QueryPoint {
    /// Creates a new point.
    pub fn new(x: f64, y: f64, srid: impl Into<Srid>) -> Self {
        Self {
            x,
            y,
            srid: srid.into(),
        }
    }

    /// Creates a WGS84 longitude/latitude point.
    pub fn wgs84(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, Srid::WGS84)
    }

    /// Reprojects the point into `target`.
    ///
    /// Returns the point unchanged if it is already in `target`.
    pub fn transform(&self, target: Srid) -> Result<QueryPoint, TransformError> {
        let (x, y) = super::transform_xy(self.x, self.y, self.srid, target)?;
        Ok(QueryPoint::new(x, y, target))
    }
}

impl fmt::Display for QueryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POINT({} {}) SRID={}", self.x, self.y, self.srid)
    }
}

/// Errors raised while parsing user supplied coordinates.
///
/// These are client input errors and are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// SRID is not a positive integer
    #[error("SRID '{0}' not valid")]
    InvalidSrid(String),

    /// Degree/minute/second text could not be parsed
    #[error("DMS '{input}' not valid: {reason}")]
    InvalidDms { input: String, reason: String },

    /// Neither decimal nor DMS parsing succeeded for one axis
    #[error("Coordinate {axis}='{value}' parse failed (expected decimal degrees or D:M:S:DIR)")]
    InvalidCoordinate { axis: char, value: String },
}

/// Errors raised while reprojecting coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// No projection is known between the two reference systems
    #[error("Transform from EPSG:{from} to EPSG:{to} not supported")]
    Unsupported { from: Srid, to: Srid },

    /// Ordinates cannot be represented in the target system
    #[error("Coordinate ({x}, {y}) out of range for EPSG:{srid}")]
    OutOfRange { x: f64, y: f64, srid: Srid },
}
