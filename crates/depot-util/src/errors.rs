use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for depot operations outside the resolution algorithm.
#[derive(Debug, Error, Diagnostic)]
pub enum DepotError {
    /// Invalid or malformed configuration (e.g. `~/.depot/config.toml`).
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check your depot config.toml for syntax errors"))]
    Config { message: String },

    /// Dependency resolution failed (missing packages, unsatisfiable ranges, etc.).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Network request to a remote source failed.
    #[error("Network error: {message}")]
    Network { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type DepotResult<T> = miette::Result<T>;
