//! CLI command implementations.

pub mod cache;
pub mod check;
pub mod query;
