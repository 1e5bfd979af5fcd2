//! Service definitions.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Serialize, Serializer};

use super::RegistryError;
use crate::coord::{QueryPoint, Srid};

/// Default cache lifetime: one week.
pub const DEFAULT_CACHE_DURATION_SECS: u64 = 604_800;

/// Default search tolerance in meters.
pub const DEFAULT_TOLERANCE_M: f64 = 10.0;

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-z_]+$").expect("static regex is valid"))
}

/// Checks that a service, group or collection key only uses lowercase
/// letters, digits and underscores.
pub fn validate_key(key: &str) -> Result<(), RegistryError> {
    if key_pattern().is_match(key) {
        Ok(())
    } else {
        Err(RegistryError::InvalidKey(key.to_string()))
    }
}

/// Protocol spoken by a context service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Wms,
    Wfs,
    ArcRest,
    PlaceName,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Wms => "WMS",
            QueryType::Wfs => "WFS",
            QueryType::ArcRest => "ArcREST",
            QueryType::PlaceName => "PlaceName",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wms" => Ok(QueryType::Wms),
            "wfs" => Ok(QueryType::Wfs),
            "arcrest" => Ok(QueryType::ArcRest),
            "placename" => Ok(QueryType::PlaceName),
            other => Err(format!("unknown query type '{}'", other)),
        }
    }
}

impl Serialize for QueryType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Optional credentials sent with every request to a service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

/// Known-good sample used to check whether a service is online.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusProbe {
    pub point: QueryPoint,
    pub expected: String,
}

/// Connection and query parameters of one external context service.
///
/// Definitions are read-only once loaded; fetch requests share them through
/// an `Arc` so the registry is never touched during a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDefinition {
    /// Unique key, `^[0-9a-z_]+$`
    pub key: String,
    pub name: String,
    pub description: String,
    pub query_type: QueryType,
    /// Base URL of the service endpoint
    pub url: String,
    pub credentials: Credentials,
    /// Layer to query (WMS `LAYERS`, WFS `TYPENAME`, ArcREST `layers`)
    pub layer_typename: String,
    /// Attribute holding the result value
    pub layer_name: String,
    /// Protocol version, e.g. `1.3.0`
    pub service_version: String,
    /// Native SRID of the service
    pub srid: Srid,
    /// Lifetime of cached results
    pub cache_duration: Duration,
    /// Default search tolerance in meters
    pub tolerance: f64,
    pub status_probe: Option<StatusProbe>,
}

impl ServiceDefinition {
    /// Starts building a definition. Optional fields take their defaults.
    pub fn builder(
        key: impl Into<String>,
        query_type: QueryType,
        url: impl Into<String>,
    ) -> ServiceDefinitionBuilder {
        ServiceDefinitionBuilder::new(key.into(), query_type, url.into())
    }
}

/// Builder for [`ServiceDefinition`].
#[derive(Debug, Clone)]
pub struct ServiceDefinitionBuilder {
    definition: ServiceDefinition,
}

impl ServiceDefinitionBuilder {
    fn new(key: String, query_type: QueryType, url: String) -> Self {
        Self {
            definition: ServiceDefinition {
                name: key.clone(),
                key,
                description: String::new(),
                query_type,
                url,
                credentials: Credentials::default(),
                layer_typename: String::new(),
                layer_name: String::new(),
                service_version: String::new(),
                srid: Srid::WGS84,
                cache_duration: Duration::from_secs(DEFAULT_CACHE_DURATION_SECS),
                tolerance: DEFAULT_TOLERANCE_M,
                status_probe: None,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.definition.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.definition.description = description.into();
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.definition.credentials = credentials;
        self
    }

    pub fn layer_typename(mut self, layer: impl Into<String>) -> Self {
        self.definition.layer_typename = layer.into();
        self
    }

    pub fn layer_name(mut self, field: impl Into<String>) -> Self {
        self.definition.layer_name = field.into();
        self
    }

    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.definition.service_version = version.into();
        self
    }

    pub fn srid(mut self, srid: impl Into<Srid>) -> Self {
        self.definition.srid = srid.into();
        self
    }

    pub fn cache_duration(mut self, duration: Duration) -> Self {
        self.definition.cache_duration = duration;
        self
    }

    pub fn tolerance(mut self, meters: f64) -> Self {
        self.definition.tolerance = meters;
        self
    }

    pub fn status_probe(mut self, point: QueryPoint, expected: impl Into<String>) -> Self {
        self.definition.status_probe = Some(StatusProbe {
            point,
            expected: expected.into(),
        });
        self
    }

    /// Validates and returns the definition.
    pub fn build(self) -> Result<ServiceDefinition, RegistryError> {
        let definition = self.definition;
        validate_key(&definition.key)?;

        if definition.url.trim().is_empty() {
            return Err(RegistryError::MissingField {
                key: definition.key,
                field: "url",
            });
        }
        if !definition.srid.is_supported() {
            return Err(RegistryError::InvalidDefinition {
                key: definition.key,
                reason: format!("SRID {} cannot be reprojected", definition.srid),
            });
        }
        if !(definition.tolerance.is_finite() && definition.tolerance > 0.0) {
            return Err(RegistryError::InvalidDefinition {
                key: definition.key,
                reason: format!("tolerance must be positive, got {}", definition.tolerance),
            });
        }
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_parse() {
        assert_eq!("WMS".parse::<QueryType>().unwrap(), QueryType::Wms);
        assert_eq!("arcrest".parse::<QueryType>().unwrap(), QueryType::ArcRest);
        assert_eq!(" PlaceName ".parse::<QueryType>().unwrap(), QueryType::PlaceName);
        assert!("wcs".parse::<QueryType>().is_err());
    }

    #[test]
    fn test_query_type_display() {
        assert_eq!(QueryType::ArcRest.to_string(), "ArcREST");
        assert_eq!(
            serde_json::to_string(&QueryType::Wfs).unwrap(),
            "\"WFS\""
        );
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("sa_rainfall_2020").is_ok());
        assert!(validate_key("Rainfall").is_err());
        assert!(validate_key("rain-fall").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let service = ServiceDefinition::builder("altitude", QueryType::Wms, "http://example.com/wms")
            .build()
            .unwrap();
        assert_eq!(service.name, "altitude");
        assert_eq!(service.srid, Srid::WGS84);
        assert_eq!(service.cache_duration, Duration::from_secs(604_800));
        assert_eq!(service.tolerance, 10.0);
        assert!(service.status_probe.is_none());
    }

    #[test]
    fn test_builder_rejects_bad_key() {
        let result = ServiceDefinition::builder("Altitude", QueryType::Wms, "http://x").build();
        assert!(matches!(result, Err(RegistryError::InvalidKey(_))));
    }

    #[test]
    fn test_builder_rejects_missing_url() {
        let result = ServiceDefinition::builder("altitude", QueryType::Wms, " ").build();
        assert!(matches!(
            result,
            Err(RegistryError::MissingField { field: "url", .. })
        ));
    }

    #[test]
    fn test_builder_rejects_unsupported_srid() {
        let result = ServiceDefinition::builder("altitude", QueryType::Wms, "http://x")
            .srid(Srid(32735))
            .build();
        assert!(matches!(result, Err(RegistryError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_builder_rejects_zero_tolerance() {
        let result = ServiceDefinition::builder("altitude", QueryType::Wms, "http://x")
            .tolerance(0.0)
            .build();
        assert!(matches!(result, Err(RegistryError::InvalidDefinition { .. })));
    }
}
