//! Feature geometries returned by context providers.
//!
//! A [`Geometry`] pairs a GeoJSON [`Shape`] with the SRID its ordinates are
//! expressed in. Provider payloads are decoded from GeoJSON or Esri JSON,
//! reprojected into the cache reference system and flattened to 2D before
//! storage.

mod esri;
mod shape;

pub use esri::esri_to_shape;
pub use shape::{Position, Shape};

use geo::{Closest, ClosestPoint, Intersects, Point};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{transform_xy, QueryPoint, Srid, TransformError};

/// Errors raised while decoding or processing geometries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Ordinates could not be reprojected
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Z ordinates could not be removed
    #[error("Cannot flatten geometry: {0}")]
    CannotFlatten(String),

    /// Payload is not a recognizable geometry
    #[error("Malformed geometry: {0}")]
    Malformed(String),

    /// Geometry has no positions to measure against
    #[error("Geometry is empty")]
    Empty,
}

/// Encoding of a raw geometry payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFormat {
    /// RFC 7946 geometry object
    GeoJson,
    /// ArcGIS REST geometry (`x`/`y`, `points`, `paths` or `rings`)
    Esri,
}

/// A shape with its spatial reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub srid: Srid,
    pub shape: Shape,
}

impl Geometry {
    pub fn new(shape: Shape, srid: impl Into<Srid>) -> Self {
        Self {
            shape,
            srid: srid.into(),
        }
    }

    /// Point geometry at a query location.
    pub fn from_point(point: &QueryPoint) -> Self {
        Self::new(Shape::point(point.x, point.y), point.srid)
    }

    /// Decodes a raw provider geometry.
    ///
    /// Strings are treated as embedded JSON documents.
    pub fn parse(
        raw: &serde_json::Value,
        format: GeometryFormat,
        srid: Srid,
    ) -> Result<Self, GeometryError> {
        if let serde_json::Value::String(text) = raw {
            let value: serde_json::Value = serde_json::from_str(text)
                .map_err(|e| GeometryError::Malformed(e.to_string()))?;
            return Self::parse(&value, format, srid);
        }

        let shape = match format {
            GeometryFormat::GeoJson => Shape::deserialize(raw)
                .map_err(|e| GeometryError::Malformed(e.to_string()))?,
            GeometryFormat::Esri => esri_to_shape(raw)?,
        };
        Ok(Self::new(shape, srid))
    }

    pub fn has_z(&self) -> bool {
        self.shape.has_z()
    }

    /// Returns a 2D copy of the geometry.
    pub fn flatten(self) -> Result<Self, GeometryError> {
        Ok(Self {
            srid: self.srid,
            shape: self.shape.flatten()?,
        })
    }

    /// Reprojects every position into `target`, keeping Z ordinates.
    pub fn transform(&self, target: Srid) -> Result<Self, GeometryError> {
        let mut shape = self.shape.clone();
        if self.srid.canonical() != target.canonical() {
            let from = self.srid;
            shape.try_for_each_position_mut(&mut |p| -> Result<(), GeometryError> {
                if p.len() < 2 {
                    return Err(GeometryError::Malformed(format!(
                        "position with {} ordinates",
                        p.len()
                    )));
                }
                let (x, y) = transform_xy(p[0], p[1], from, target)?;
                p[0] = x;
                p[1] = y;
                Ok(())
            })?;
        }
        Ok(Self {
            srid: target,
            shape,
        })
    }

    /// Planar distance from `point` to the nearest part of the geometry, in
    /// units of this geometry's SRID. Zero when the point is inside or on it.
    pub fn distance_to(&self, point: &QueryPoint) -> Result<f64, GeometryError> {
        let point = point.transform(self.srid)?;
        let target = Point::new(point.x, point.y);
        let geometry = self.shape.to_geo()?;

        if geometry.intersects(&target) {
            return Ok(0.0);
        }

        match geometry.closest_point(&target) {
            Closest::Intersection(_) => Ok(0.0),
            Closest::SinglePoint(p) => Ok((p.x() - target.x()).hypot(p.y() - target.y())),
            Closest::Indeterminate => Err(GeometryError::Empty),
        }
    }
}
