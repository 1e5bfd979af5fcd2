//! INI registry document parsing.
//!
//! ```ini
//! [service.altitude]
//! name = Altitude
//! query_type = WMS
//! url = https://maps.example.org/geoserver/wms
//! layer_typename = south_africa
//! layer_name = GRAY_INDEX
//! service_version = 1.3.0
//!
//! [group.terrain]
//! name = Terrain
//! services = altitude, slope
//!
//! [collection.physical]
//! groups = terrain
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use tracing::debug;

use super::{
    Collection, ConfigStore, Credentials, Group, InMemoryConfigStore, QueryType, RegistryError,
    ServiceDefinition,
};
use crate::coord::{QueryPoint, Srid};

const SERVICE_PREFIX: &str = "service.";
const GROUP_PREFIX: &str = "group.";
const COLLECTION_PREFIX: &str = "collection.";

/// Loads a registry document from disk.
pub fn load_registry(path: &Path) -> Result<InMemoryConfigStore, RegistryError> {
    let ini = Ini::load_from_file(path)?;
    parse_registry(&ini)
}

/// Parses a registry document held in memory.
pub fn parse_registry_str(text: &str) -> Result<InMemoryConfigStore, RegistryError> {
    let ini = Ini::load_from_str(text).map_err(ini::Error::Parse)?;
    parse_registry(&ini)
}

/// Builds a store from a parsed document.
///
/// Services are inserted first, then groups, then collections, so members
/// may be declared in any order within the file.
pub fn parse_registry(ini: &Ini) -> Result<InMemoryConfigStore, RegistryError> {
    let mut store = InMemoryConfigStore::new();

    for (name, section) in sections_with_prefix(ini, SERVICE_PREFIX) {
        store.insert_service(parse_service(name, section)?)?;
    }
    for (name, section) in sections_with_prefix(ini, GROUP_PREFIX) {
        store.insert_group(parse_group(name, section)?)?;
    }
    for (name, section) in sections_with_prefix(ini, COLLECTION_PREFIX) {
        store.insert_collection(parse_collection(name, section))?;
    }

    debug!(
        services = store.service_keys().len(),
        groups = store.group_keys().len(),
        collections = store.collection_keys().len(),
        "Registry loaded"
    );
    Ok(store)
}

fn sections_with_prefix<'a>(
    ini: &'a Ini,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a str, &'a Properties)> + 'a {
    ini.iter().filter_map(move |(name, section)| {
        name.and_then(|n| n.strip_prefix(prefix))
            .map(|key| (key, section))
    })
}

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn text(section: &Properties, key: &str) -> Option<String> {
    section
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parsed<T: FromStr>(
    section_name: &str,
    section: &Properties,
    key: &str,
    reason: &str,
) -> Result<Option<T>, RegistryError> {
    match text(section, key) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| invalid(section_name, key, &v, reason)),
        None => Ok(None),
    }
}

fn parse_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_service(key: &str, section: &Properties) -> Result<ServiceDefinition, RegistryError> {
    let section_name = format!("{}{}", SERVICE_PREFIX, key);

    let query_type = match text(section, "query_type") {
        Some(v) => QueryType::from_str(&v).map_err(|_| {
            invalid(
                &section_name,
                "query_type",
                &v,
                "must be one of: WMS, WFS, ArcREST, PlaceName",
            )
        })?,
        None => {
            return Err(RegistryError::MissingField {
                key: key.to_string(),
                field: "query_type",
            })
        }
    };
    let url = text(section, "url").ok_or_else(|| RegistryError::MissingField {
        key: key.to_string(),
        field: "url",
    })?;

    let mut builder = ServiceDefinition::builder(key, query_type, url)
        .credentials(Credentials {
            username: text(section, "username"),
            password: text(section, "password"),
            api_key: text(section, "api_key"),
        })
        .description(text(section, "description").unwrap_or_default())
        .layer_typename(text(section, "layer_typename").unwrap_or_default())
        .layer_name(text(section, "layer_name").unwrap_or_default())
        .service_version(text(section, "service_version").unwrap_or_default());

    if let Some(name) = text(section, "name") {
        builder = builder.name(name);
    }
    if let Some(srid) = parsed::<u32>(&section_name, section, "srid", "must be an EPSG code")? {
        let srid = Srid(srid);
        if !srid.is_supported() {
            return Err(RegistryError::InvalidValue {
                section: section_name,
                key: "srid".to_string(),
                value: srid.to_string(),
                reason: "unsupported SRID, use 4326, 3857 or 900913".to_string(),
            });
        }
        builder = builder.srid(srid);
    }
    if let Some(secs) = parsed::<u64>(
        &section_name,
        section,
        "cache_duration",
        "must be a whole number of seconds",
    )? {
        builder = builder.cache_duration(Duration::from_secs(secs));
    }
    if let Some(meters) =
        parsed::<f64>(&section_name, section, "tolerance", "must be a number (meters)")?
    {
        builder = builder.tolerance(meters);
    }

    let test_x = parsed::<f64>(&section_name, section, "test_x", "must be a number")?;
    let test_y = parsed::<f64>(&section_name, section, "test_y", "must be a number")?;
    let test_value = text(section, "test_value");
    match (test_x, test_y, test_value) {
        (Some(x), Some(y), Some(value)) => {
            // Probe coordinates are always longitude / latitude
            builder = builder.status_probe(QueryPoint::wgs84(x, y), value);
        }
        (None, None, None) => {}
        _ => {
            return Err(invalid(
                &section_name,
                "test_x",
                "",
                "test_x, test_y and test_value must be set together",
            ))
        }
    }

    builder.build()
}

fn parse_group(key: &str, section: &Properties) -> Result<Group, RegistryError> {
    let section_name = format!("{}{}", GROUP_PREFIX, key);
    let graphable = match text(section, "graphable") {
        Some(v) => parse_bool(&v).ok_or_else(|| {
            invalid(&section_name, "graphable", &v, "must be true or false")
        })?,
        None => false,
    };

    Ok(Group {
        key: key.to_string(),
        name: text(section, "name").unwrap_or_else(|| key.to_string()),
        description: text(section, "description").unwrap_or_default(),
        graphable,
        services: parse_list(text(section, "services")),
    })
}

fn parse_collection(key: &str, section: &Properties) -> Collection {
    Collection {
        key: key.to_string(),
        name: text(section, "name").unwrap_or_else(|| key.to_string()),
        description: text(section, "description").unwrap_or_default(),
        groups: parse_list(text(section, "groups")),
    }
}

/// Parses the boolean spellings accepted in INI files.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}
