//! Package sources: the capability the resolver queries for metadata and
//! version listings, plus the local filesystem and HTTP implementations.

pub mod http;
pub mod local;
pub mod registry;
pub mod source;

pub use source::{PackageSource, SourceError};
