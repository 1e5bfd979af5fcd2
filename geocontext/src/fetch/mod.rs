//! Fetching context values from external services.
//!
//! Cache misses are turned into [`FetchRequest`]s, run concurrently by the
//! [`FetchOrchestrator`] and narrowed to a single value per service by
//! [`resolve_nearest`].

mod orchestrator;
mod request;
mod resolver;

pub use orchestrator::FetchOrchestrator;
pub use request::{FetchRequest, FetchStatus, TaggedRequest};
pub use resolver::{raw_ordinate_count, resolve_nearest, Resolution};
