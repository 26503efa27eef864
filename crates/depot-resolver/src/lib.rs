//! Dependency resolution engine: version-range matching, concurrent
//! multi-source lookups with deterministic selection, recursive resolution
//! with cycle truncation, and dependency tree/graph views over the
//! published-package catalog.

pub mod catalog;
pub mod conflict;
pub mod error;
pub mod fanout;
pub mod graph;
pub mod path;
pub mod resolver;

pub use depot_core::version;
pub use error::ResolveError;
