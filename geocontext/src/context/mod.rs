//! Context retrieval.
//!
//! [`ContextService`] answers "what is known about this point" for a single
//! service, a group of services or a collection of groups. Each lookup
//! tries the spatial cache first and fetches all misses in one concurrent
//! batch; results are written back to the cache and returned in the order
//! the registry declares them.
//!
//! ```ignore
//! use geocontext::context::{render_group, ContextService, OutputFormat};
//!
//! let values = context.retrieve_group_values("climate", &point, None).await?;
//! let json = render_group(context.registry(), &values, &point, OutputFormat::GeoJson)?;
//! ```

mod error;
mod output;
mod service;

pub use error::ContextError;
pub use output::{
    entry_record, render_collection, render_entry, render_group, CollectionValues, GroupValues,
    OutputFormat,
};
pub use service::{ContextService, ServiceStatus};
