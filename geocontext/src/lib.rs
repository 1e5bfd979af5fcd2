//! GeoContext - contextual information for any map point
//!
//! This library answers "what is known about this location?" by querying a
//! registry of external geospatial services (WMS, WFS, ArcGIS REST and
//! place-name APIs), normalizing their responses to a single value and
//! geometry per service, and caching results spatially so nearby repeat
//! queries are served without network calls.
//!
//! # Modules
//!
//! - [`coord`] - SRIDs, reprojection, bounding boxes, DMS parsing
//! - [`geometry`] - GeoJSON shapes, Esri conversion, flattening, distance
//! - [`registry`] - service, group and collection definitions
//! - [`provider`] - HTTP transport and protocol adapters
//! - [`fetch`] - concurrent fetch batches and nearest-feature selection
//! - [`cache`] - spatial cache of resolved values
//! - [`context`] - service / group / collection retrieval
//! - [`config`] - application configuration
//! - [`logging`] - tracing subscriber setup

pub mod cache;
pub mod config;
pub mod context;
pub mod coord;
pub mod fetch;
pub mod geometry;
pub mod logging;
pub mod provider;
pub mod registry;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
