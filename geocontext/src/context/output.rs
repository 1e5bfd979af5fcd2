//! Result shapes and their JSON / GeoJSON renderings.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};

use super::ContextError;
use crate::cache::CacheEntry;
use crate::coord::{QueryPoint, Srid};
use crate::geometry::{Geometry, GeometryError};
use crate::registry::{ConfigStore, ServiceDefinition};

/// Values of one group, in the group's declared service order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValues {
    pub key: String,
    pub name: String,
    pub graphable: bool,
    pub values: Vec<CacheEntry>,
}

/// Values of one collection, in the collection's declared group order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionValues {
    pub key: String,
    pub name: String,
    pub groups: Vec<GroupValues>,
}

impl GroupValues {
    pub fn has_values(&self) -> bool {
        self.values.iter().any(|entry| entry.value.is_some())
    }
}

impl CollectionValues {
    pub fn has_values(&self) -> bool {
        self.groups.iter().any(GroupValues::has_values)
    }
}

/// Output encoding selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Plain attribute records
    #[default]
    Json,
    /// Records wrapped in a GeoJSON `Feature`
    GeoJson,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::GeoJson => write!(f, "geojson"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "geojson" => Ok(OutputFormat::GeoJson),
            other => Err(format!("unknown output format '{}' (json, geojson)", other)),
        }
    }
}

/// Attribute record of one value.
pub fn entry_record(service: &ServiceDefinition, entry: &CacheEntry) -> Value {
    json!({
        "key": service.key,
        "name": service.name,
        "description": service.description,
        "query_type": service.query_type,
        "value": entry.value,
    })
}

/// Renders a single service value. GeoJSON uses the entry's geometry.
pub fn render_entry<S: ConfigStore + ?Sized>(
    registry: &S,
    entry: &CacheEntry,
    format: OutputFormat,
) -> Result<Value, ContextError> {
    let service = registry.service(&entry.service_key)?;
    let record = entry_record(&service, entry);
    match format {
        OutputFormat::Json => Ok(record),
        OutputFormat::GeoJson => feature(&entry.geometry, record),
    }
}

/// Renders a group. GeoJSON uses the query point as geometry.
pub fn render_group<S: ConfigStore + ?Sized>(
    registry: &S,
    group: &GroupValues,
    point: &QueryPoint,
    format: OutputFormat,
) -> Result<Value, ContextError> {
    let payload = group_payload(registry, group)?;
    wrap(payload, point, format)
}

/// Renders a collection. GeoJSON uses the query point as geometry.
pub fn render_collection<S: ConfigStore + ?Sized>(
    registry: &S,
    collection: &CollectionValues,
    point: &QueryPoint,
    format: OutputFormat,
) -> Result<Value, ContextError> {
    let groups = collection
        .groups
        .iter()
        .map(|group| group_payload(registry, group))
        .collect::<Result<Vec<_>, _>>()?;
    let payload = json!({
        "key": collection.key,
        "name": collection.name,
        "groups": groups,
    });
    wrap(payload, point, format)
}

fn group_payload<S: ConfigStore + ?Sized>(
    registry: &S,
    group: &GroupValues,
) -> Result<Value, ContextError> {
    let values = group
        .values
        .iter()
        .map(|entry| Ok(entry_record(&*registry.service(&entry.service_key)?, entry)))
        .collect::<Result<Vec<_>, ContextError>>()?;
    Ok(json!({
        "key": group.key,
        "name": group.name,
        "graphable": group.graphable,
        "values": values,
    }))
}

fn wrap(payload: Value, point: &QueryPoint, format: OutputFormat) -> Result<Value, ContextError> {
    match format {
        OutputFormat::Json => Ok(payload),
        OutputFormat::GeoJson => feature(&Geometry::from_point(point), payload),
    }
}

/// GeoJSON `Feature` with the geometry in longitude/latitude.
fn feature(geometry: &Geometry, properties: Value) -> Result<Value, ContextError> {
    let geometry = geometry
        .transform(Srid::WGS84)
        .map_err(|e: GeometryError| ContextError::InvalidInput(e.to_string()))?;
    let shape = serde_json::to_value(&geometry.shape)
        .map_err(|e| ContextError::InvalidInput(e.to_string()))?;
    Ok(json!({
        "type": "Feature",
        "geometry": shape,
        "properties": properties,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CACHE_SRID;
    use crate::registry::{InMemoryConfigStore, QueryType};
    use chrono::Utc;

    fn registry() -> InMemoryConfigStore {
        let mut store = InMemoryConfigStore::new();
        store
            .insert_service(
                ServiceDefinition::builder("rain", QueryType::Wms, "http://x/wms")
                    .name("Rainfall")
                    .description("Mean annual rainfall")
                    .service_version("1.1.1")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        store
    }

    fn entry(value: Option<&str>) -> CacheEntry {
        let point = QueryPoint::wgs84(27.8, -32.1).transform(CACHE_SRID).unwrap();
        CacheEntry {
            id: Some(1),
            service_key: "rain".to_string(),
            name: "Rainfall".to_string(),
            source_uri: None,
            geometry: Geometry::from_point(&point),
            value: value.map(str::to_string),
            created_at: Utc::now(),
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("GeoJSON".parse::<OutputFormat>(), Ok(OutputFormat::GeoJson));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_render_entry_json() {
        let value = render_entry(&registry(), &entry(Some("746.0")), OutputFormat::Json).unwrap();
        assert_eq!(value["key"], "rain");
        assert_eq!(value["description"], "Mean annual rainfall");
        assert_eq!(value["query_type"], "WMS");
        assert_eq!(value["value"], "746.0");
    }

    #[test]
    fn test_render_entry_geojson_in_wgs84() {
        let value = render_entry(&registry(), &entry(None), OutputFormat::GeoJson).unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "Point");
        let lon = value["geometry"]["coordinates"][0].as_f64().unwrap();
        assert!((lon - 27.8).abs() < 1e-9);
        assert!(value["properties"]["value"].is_null());
    }

    #[test]
    fn test_render_group() {
        let group = GroupValues {
            key: "climate".to_string(),
            name: "Climate".to_string(),
            graphable: true,
            values: vec![entry(Some("1")), entry(None)],
        };
        assert!(group.has_values());

        let point = QueryPoint::wgs84(27.8, -32.1);
        let json = render_group(&registry(), &group, &point, OutputFormat::Json).unwrap();
        assert_eq!(json["values"].as_array().unwrap().len(), 2);
        assert!(json["values"][1]["value"].is_null());

        let feature = render_group(&registry(), &group, &point, OutputFormat::GeoJson).unwrap();
        assert_eq!(feature["properties"]["key"], "climate");
        assert_eq!(feature["geometry"]["coordinates"][1], -32.1);
    }

    #[test]
    fn test_render_unknown_service() {
        let mut orphan = entry(Some("1"));
        orphan.service_key = "gone".to_string();
        let result = render_entry(&registry(), &orphan, OutputFormat::Json);
        assert!(matches!(result, Err(ContextError::NotFound(_))));
    }
}
