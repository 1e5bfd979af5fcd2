//! Provider types shared by all protocol adapters

use std::fmt;

use reqwest::Url;

use crate::registry::QueryType;

/// Errors that can occur while querying a context service.
///
/// These never escape a fetch batch: the orchestrator logs them and marks
/// the request as failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Request could not be built for the service
    InvalidRequest(String),
    /// HTTP request could not be sent or its body read
    HttpError(String),
    /// Service answered with a non-success status
    Status { status: u16, url: String },
    /// Request did not complete before the batch deadline
    Timeout(String),
    /// Body is not the JSON document the protocol promises
    InvalidResponse(String),
    /// Response contained no usable feature
    NoFeatures,
    /// Response is missing an expected member
    MissingField(String),
    /// Protocol version is not handled by the adapter
    UnsupportedVersion {
        query_type: QueryType,
        version: String,
    },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::Status { status, url } => write!(f, "HTTP {} from {}", status, url),
            ProviderError::Timeout(url) => write!(f, "Request timed out: {}", url),
            ProviderError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ProviderError::NoFeatures => write!(f, "No features found"),
            ProviderError::MissingField(field) => write!(f, "Response missing '{}'", field),
            ProviderError::UnsupportedVersion {
                query_type,
                version,
            } => write!(f, "'{}' not a supported {} version", version, query_type),
        }
    }
}

impl std::error::Error for ProviderError {}

/// One (value, geometry) pair extracted from a provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Rendered value; `None` when the provider returned JSON null
    pub value: Option<String>,
    /// Raw geometry as sent by the provider (GeoJSON or Esri JSON)
    pub geometry: Option<serde_json::Value>,
}

impl Candidate {
    pub fn new(value: Option<String>, geometry: Option<serde_json::Value>) -> Self {
        Self { value, geometry }
    }
}

/// A GET request ready to be sent: base URL plus ordered query parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub base_url: String,
    pub params: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter, keeping insertion order.
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Sets a parameter, replacing any earlier value with the same name.
    pub fn set(&mut self, name: &str, value: impl ToString) {
        self.remove(name);
        self.params.push((name.to_string(), value.to_string()));
    }

    /// Removes a parameter, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.params.iter().position(|(n, _)| n == name)?;
        Some(self.params.remove(index).1)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Encodes the request URL. Parameters are appended to any query string
    /// already present in the base URL.
    pub fn to_url(&self) -> Result<Url, ProviderError> {
        Url::parse_with_params(&self.base_url, &self.params)
            .map_err(|e| ProviderError::InvalidRequest(format!("URL '{}': {}", self.base_url, e)))
    }
}

/// Renders a JSON value the way it is stored in the cache.
///
/// Strings lose trailing whitespace, numbers and booleans use their JSON
/// text (`746.0`), and null yields `None`. Arrays and objects are kept as
/// compact JSON.
pub fn render_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.trim_end().to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("Fynbos  ")), Some("Fynbos".to_string()));
        assert_eq!(render_value(&json!(746.0)), Some("746.0".to_string()));
        assert_eq!(render_value(&json!(12)), Some("12".to_string()));
        assert_eq!(render_value(&json!(true)), Some("true".to_string()));
        assert_eq!(render_value(&json!(null)), None);
    }

    #[test]
    fn test_descriptor_url_encoding() {
        let request = RequestDescriptor::new("http://example.com/wms")
            .param("LAYERS", "a:b")
            .param("BBOX", "1,2,3,4");
        let url = request.to_url().unwrap();
        assert_eq!(
            url.as_str(),
            "http://example.com/wms?LAYERS=a%3Ab&BBOX=1%2C2%2C3%2C4"
        );
    }

    #[test]
    fn test_descriptor_keeps_existing_query() {
        let request = RequestDescriptor::new("http://example.com/ows?map=rain").param("f", "json");
        let url = request.to_url().unwrap();
        assert_eq!(url.query(), Some("map=rain&f=json"));
    }

    #[test]
    fn test_descriptor_set_and_remove() {
        let mut request = RequestDescriptor::new("http://x").param("FILTER", "f").param("A", 1);
        assert_eq!(request.remove("FILTER"), Some("f".to_string()));
        assert_eq!(request.get("FILTER"), None);

        request.set("A", 2);
        assert_eq!(request.get("A"), Some("2"));
        assert_eq!(request.params.len(), 1);
    }

    #[test]
    fn test_invalid_url() {
        let request = RequestDescriptor::new("not a url");
        assert!(matches!(request.to_url(), Err(ProviderError::InvalidRequest(_))));
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::UnsupportedVersion {
            query_type: QueryType::Wms,
            version: "9.9".to_string(),
        };
        assert_eq!(err.to_string(), "'9.9' not a supported WMS version");
    }
}
