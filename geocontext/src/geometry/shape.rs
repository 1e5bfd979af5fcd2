//! GeoJSON geometry shapes with optional Z ordinates.

use geo_types::{
    Coord, Geometry as GeoGeometry, GeometryCollection, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon,
};
use serde::{Deserialize, Serialize};

use super::GeometryError;

/// A single GeoJSON position: `[x, y]` or `[x, y, z]`.
pub type Position = Vec<f64>;

/// GeoJSON geometry object.
///
/// Positions keep whatever dimension the provider sent, so a shape can be
/// inspected for Z values before it is flattened for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Shape> },
}

impl Shape {
    /// Creates a 2D point.
    pub fn point(x: f64, y: f64) -> Self {
        Shape::Point {
            coordinates: vec![x, y],
        }
    }

    /// Returns the GeoJSON type name.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Point { .. } => "Point",
            Shape::MultiPoint { .. } => "MultiPoint",
            Shape::LineString { .. } => "LineString",
            Shape::MultiLineString { .. } => "MultiLineString",
            Shape::Polygon { .. } => "Polygon",
            Shape::MultiPolygon { .. } => "MultiPolygon",
            Shape::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    /// Calls `f` for every position in the shape.
    pub fn for_each_position(&self, f: &mut impl FnMut(&Position)) {
        match self {
            Shape::Point { coordinates } => f(coordinates),
            Shape::MultiPoint { coordinates } | Shape::LineString { coordinates } => {
                coordinates.iter().for_each(f)
            }
            Shape::MultiLineString { coordinates } | Shape::Polygon { coordinates } => {
                coordinates.iter().flatten().for_each(f)
            }
            Shape::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().for_each(f)
            }
            Shape::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.for_each_position(f);
                }
            }
        }
    }

    /// Applies `f` to every position, stopping at the first error.
    pub fn try_for_each_position_mut<E>(
        &mut self,
        f: &mut impl FnMut(&mut Position) -> Result<(), E>,
    ) -> Result<(), E> {
        match self {
            Shape::Point { coordinates } => f(coordinates),
            Shape::MultiPoint { coordinates } | Shape::LineString { coordinates } => {
                coordinates.iter_mut().try_for_each(f)
            }
            Shape::MultiLineString { coordinates } | Shape::Polygon { coordinates } => {
                coordinates.iter_mut().flatten().try_for_each(f)
            }
            Shape::MultiPolygon { coordinates } => {
                coordinates.iter_mut().flatten().flatten().try_for_each(f)
            }
            Shape::GeometryCollection { geometries } => geometries
                .iter_mut()
                .try_for_each(|g| g.try_for_each_position_mut(f)),
        }
    }

    /// Number of ordinates across all positions.
    pub fn ordinate_count(&self) -> usize {
        let mut count = 0;
        self.for_each_position(&mut |p| count += p.len());
        count
    }

    /// Returns true if any position carries a Z (or higher) ordinate.
    pub fn has_z(&self) -> bool {
        let mut has_z = false;
        self.for_each_position(&mut |p| has_z |= p.len() > 2);
        has_z
    }

    /// Drops Z ordinates, returning a 2D shape.
    ///
    /// A shape that is already 2D is returned unchanged.
    ///
    /// # Errors
    ///
    /// `GeometryError::CannotFlatten` if a position has fewer than two
    /// ordinates or the result still reports a Z dimension.
    pub fn flatten(mut self) -> Result<Shape, GeometryError> {
        if !self.has_z() {
            return Ok(self);
        }

        self.try_for_each_position_mut(&mut |p| {
            if p.len() < 2 {
                return Err(GeometryError::CannotFlatten(format!(
                    "position with {} ordinates",
                    p.len()
                )));
            }
            p.truncate(2);
            Ok(())
        })?;

        if self.has_z() {
            return Err(GeometryError::CannotFlatten(self.kind().to_string()));
        }
        Ok(self)
    }

    /// Converts to a planar `geo-types` geometry, ignoring Z ordinates.
    pub fn to_geo(&self) -> Result<GeoGeometry<f64>, GeometryError> {
        Ok(match self {
            Shape::Point { coordinates } => GeoGeometry::Point(Point::from(coord(coordinates)?)),
            Shape::MultiPoint { coordinates } => GeoGeometry::MultiPoint(MultiPoint(
                coordinates
                    .iter()
                    .map(|p| coord(p).map(Point::from))
                    .collect::<Result<_, _>>()?,
            )),
            Shape::LineString { coordinates } => GeoGeometry::LineString(line(coordinates)?),
            Shape::MultiLineString { coordinates } => GeoGeometry::MultiLineString(
                MultiLineString(coordinates.iter().map(|l| line(l)).collect::<Result<_, _>>()?),
            ),
            Shape::Polygon { coordinates } => GeoGeometry::Polygon(polygon(coordinates)?),
            Shape::MultiPolygon { coordinates } => GeoGeometry::MultiPolygon(MultiPolygon(
                coordinates
                    .iter()
                    .map(|rings| polygon(rings))
                    .collect::<Result<_, _>>()?,
            )),
            Shape::GeometryCollection { geometries } => {
                GeoGeometry::GeometryCollection(GeometryCollection(
                    geometries
                        .iter()
                        .map(Shape::to_geo)
                        .collect::<Result<_, _>>()?,
                ))
            }
        })
    }
}

fn coord(position: &Position) -> Result<Coord<f64>, GeometryError> {
    match position.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        _ => Err(GeometryError::Malformed(format!(
            "invalid position {:?}",
            position
        ))),
    }
}

fn line(positions: &[Position]) -> Result<LineString<f64>, GeometryError> {
    Ok(LineString(
        positions.iter().map(coord).collect::<Result<_, _>>()?,
    ))
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, GeometryError> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| GeometryError::Malformed("polygon without rings".to_string()))?;
    Ok(Polygon::new(
        line(exterior)?,
        interiors.iter().map(|r| line(r)).collect::<Result<_, _>>()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_3d() -> Shape {
        Shape::Polygon {
            coordinates: vec![vec![
                vec![0.0, 0.0, 5.0],
                vec![1.0, 0.0, 5.0],
                vec![1.0, 1.0, 5.0],
                vec![0.0, 1.0, 5.0],
                vec![0.0, 0.0, 5.0],
            ]],
        }
    }

    #[test]
    fn test_deserialize_geojson_point() {
        let shape: Shape =
            serde_json::from_str(r#"{"type": "Point", "coordinates": [27.8, -32.1]}"#).unwrap();
        assert_eq!(shape, Shape::point(27.8, -32.1));
        assert!(!shape.has_z());
    }

    #[test]
    fn test_deserialize_ignores_foreign_members() {
        let shape: Shape = serde_json::from_str(
            r#"{"type": "LineString", "bbox": [0, 0, 1, 1], "coordinates": [[0, 0], [1, 1]]}"#,
        )
        .unwrap();
        assert_eq!(shape.kind(), "LineString");
    }

    #[test]
    fn test_serialize_geojson_polygon() {
        let json = serde_json::to_value(square_3d().flatten().unwrap()).unwrap();
        assert_eq!(json["type"], "Polygon");
        assert_eq!(json["coordinates"][0][2], serde_json::json!([1.0, 1.0]));
    }

    #[test]
    fn test_flatten_ignores_2d() {
        let point = Shape::point(1.0, 2.0);
        assert_eq!(point.clone().flatten().unwrap(), point);
    }

    #[test]
    fn test_flatten_3d_keeps_xy() {
        let flat = square_3d().flatten().unwrap();
        assert!(!flat.has_z());

        let mut original = Vec::new();
        square_3d().for_each_position(&mut |p| original.push((p[0], p[1])));
        let mut flattened = Vec::new();
        flat.for_each_position(&mut |p| flattened.push((p[0], p[1])));
        assert_eq!(original, flattened);
    }

    #[test]
    fn test_flatten_rejects_short_position() {
        let shape = Shape::LineString {
            coordinates: vec![vec![0.0, 0.0, 1.0], vec![1.0]],
        };
        assert!(matches!(
            shape.flatten(),
            Err(GeometryError::CannotFlatten(_))
        ));
    }

    #[test]
    fn test_flatten_collection() {
        let shape = Shape::GeometryCollection {
            geometries: vec![Shape::Point {
                coordinates: vec![1.0, 2.0, 3.0],
            }],
        };
        let flat = shape.flatten().unwrap();
        assert_eq!(
            flat,
            Shape::GeometryCollection {
                geometries: vec![Shape::point(1.0, 2.0)]
            }
        );
    }

    #[test]
    fn test_to_geo_polygon() {
        let geo = square_3d().to_geo().unwrap();
        assert!(matches!(geo, GeoGeometry::Polygon(_)));
    }

    #[test]
    fn test_to_geo_rejects_empty_polygon() {
        let shape = Shape::Polygon {
            coordinates: vec![],
        };
        assert!(matches!(shape.to_geo(), Err(GeometryError::Malformed(_))));
    }

    #[test]
    fn test_ordinate_count() {
        assert_eq!(square_3d().ordinate_count(), 15);
        assert_eq!(Shape::point(0.0, 0.0).ordinate_count(), 2);
    }
}
