//! Shared utilities for the depot registry core.
//!
//! This crate provides cross-cutting concerns used by all other depot crates:
//! the unified error type and a few filesystem helpers.

pub mod errors;
pub mod fs;
