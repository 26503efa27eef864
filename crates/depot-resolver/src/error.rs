//! Failure kinds of resolution and tree building.

use miette::Diagnostic;
use thiserror::Error;

use depot_util::errors::DepotError;

/// Smallest accepted tree depth.
pub const MIN_TREE_DEPTH: usize = 1;
/// Largest accepted tree depth.
pub const MAX_TREE_DEPTH: usize = 50;

#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum ResolveError {
    /// No source (or the catalog) had metadata for `id@version`.
    #[error("Package {package_id}@{version} not found{}", fmt_diagnostics(.diagnostics))]
    #[diagnostic(help("Check the package id and that at least one enabled source publishes it"))]
    NotFound {
        package_id: String,
        version: String,
        diagnostics: Option<String>,
    },

    /// A version range matched nothing available.
    #[error("No version of {package_id} satisfies '{range}'")]
    Unsatisfiable { package_id: String, range: String },

    /// A required dependency could not be satisfied; aborts the whole call.
    #[error("Required dependency {package_id}@{range} could not be resolved")]
    DependencyResolutionFailed {
        package_id: String,
        range: String,
        conflicts: Vec<String>,
    },

    /// Caller asked for a tree depth outside the accepted bounds.
    #[error(
        "maxDepth must be between {} and {}, got {max_depth}",
        MIN_TREE_DEPTH,
        MAX_TREE_DEPTH
    )]
    DepthExceeded { max_depth: usize },

    /// No sources were supplied to a resolver.
    #[error("Invalid source configuration: {message}")]
    InvalidSource { message: String },
}

fn fmt_diagnostics(diagnostics: &Option<String>) -> String {
    match diagnostics {
        Some(d) if !d.is_empty() => format!(" ({d})"),
        _ => String::new(),
    }
}

impl From<ResolveError> for DepotError {
    fn from(err: ResolveError) -> Self {
        DepotError::Resolution {
            message: err.to_string(),
        }
    }
}
