//! Errors surfaced by context lookups.

use thiserror::Error;

use crate::cache::CacheError;
use crate::coord::{ParseError, TransformError};
use crate::registry::RegistryError;

/// Errors returned by [`ContextService`](super::ContextService).
///
/// Fetch failures never appear here; they show up as entries without a
/// value.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Unknown service, group or collection key
    #[error(transparent)]
    NotFound(#[from] RegistryError),

    /// Malformed coordinates, SRID or request parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No service produced a value
    #[error("No data found for '{0}'")]
    NoData(String),

    /// Cache store failure
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ContextError {
    /// Returns true for errors caused by the caller's request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ContextError::InvalidInput(_)) || self.is_not_found()
    }

    /// Returns true when the requested key or data does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ContextError::NotFound(e) => e.is_not_found(),
            ContextError::NoData(_) => true,
            _ => false,
        }
    }
}

impl From<ParseError> for ContextError {
    fn from(e: ParseError) -> Self {
        ContextError::InvalidInput(e.to_string())
    }
}

impl From<TransformError> for ContextError {
    fn from(e: TransformError) -> Self {
        ContextError::InvalidInput(e.to_string())
    }
}
