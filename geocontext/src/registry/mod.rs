//! Service registry.
//!
//! Describes the external context services, the groups that bundle them and
//! the collections that bundle groups. The registry is read-only to the rest
//! of the crate and is normally loaded from an INI document.

mod definition;
mod loader;
mod store;

pub use definition::{
    validate_key, Credentials, QueryType, ServiceDefinition, ServiceDefinitionBuilder,
    StatusProbe, DEFAULT_CACHE_DURATION_SECS, DEFAULT_TOLERANCE_M,
};
pub use loader::{load_registry, parse_registry, parse_registry_str};
pub(crate) use loader::parse_bool;
pub use store::{Collection, ConfigStore, Group, InMemoryConfigStore};

use thiserror::Error;

/// Errors raised while loading or querying the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),

    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// Key does not match `^[0-9a-z_]+$`
    #[error("Key '{0}' not valid: only lowercase letters, digits and underscores are allowed")]
    InvalidKey(String),

    #[error("Duplicate {kind} key '{key}'")]
    DuplicateKey { kind: &'static str, key: String },

    /// A group or collection references an undefined member
    #[error("'{owner}' references unknown member '{member}'")]
    UnknownMember { owner: String, member: String },

    #[error("Service '{key}' is missing required field '{field}'")]
    MissingField { key: String, field: &'static str },

    #[error("Service '{key}' not valid: {reason}")]
    InvalidDefinition { key: String, reason: String },

    #[error("Invalid registry value: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read registry: {0}")]
    Read(#[from] ini::Error),
}

impl RegistryError {
    /// Returns true for lookups of keys that do not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::ServiceNotFound(_)
                | RegistryError::GroupNotFound(_)
                | RegistryError::CollectionNotFound(_)
        )
    }
}
