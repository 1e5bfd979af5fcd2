//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::time::Duration;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::registry::parse_bool;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        if let Some(v) = positive::<usize>(section, "fetch", "connection_limit")? {
            config.fetch.connection_limit = v;
        }
        if let Some(v) = positive::<u64>(section, "fetch", "connect_timeout")? {
            config.fetch.connect_timeout = Duration::from_secs(v);
        }
        if let Some(v) = positive::<u64>(section, "fetch", "total_timeout")? {
            config.fetch.total_timeout = Duration::from_secs(v);
        }
        if let Some(v) = section.get("offload_threshold") {
            config.fetch.offload_threshold =
                v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "fetch".to_string(),
                    key: "offload_threshold".to_string(),
                    value: v.to_string(),
                    reason: "must be a whole number of ordinates".to_string(),
                })?;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("cache_null_values") {
            config.cache.cache_null_values =
                parse_bool(v).ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "cache".to_string(),
                    key: "cache_null_values".to_string(),
                    value: v.to_string(),
                    reason: "must be true or false".to_string(),
                })?;
        }
        if let Some(path) = path_value(section, "snapshot") {
            config.cache.snapshot = path;
        }
    }

    // [registry] section
    if let Some(section) = ini.section(Some("registry")) {
        if let Some(path) = path_value(section, "file") {
            config.registry.file = path;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(path) = path_value(section, "file") {
            config.logging.file = path;
        }
    }

    Ok(config)
}

fn positive<T>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    match v.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(Some(parsed)),
        _ => Err(ConfigFileError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: v.to_string(),
            reason: "must be a positive integer".to_string(),
        }),
    }
}

fn path_value(section: &Properties, key: &str) -> Option<PathBuf> {
    section
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(expand_tilde)
}

/// Expands a leading `~/` to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
