//! Core data types for the depot registry.
//!
//! This crate defines the shapes exchanged between package sources, the
//! published-package catalog, and the resolution engine, along with the
//! user configuration that decides which sources are consulted and in what
//! order.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod package;
pub mod version;
