use std::time::Duration;

use async_trait::async_trait;
use depot_core::package::PackageMetadata;
use depot_core::version;
use miette::Diagnostic;
use thiserror::Error;

/// Failure of a single source call.
///
/// These are soft failures: the fan-out collects them per source and only
/// surfaces them when no source produced an answer.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum SourceError {
    #[error("{source_name} timed out after {timeout_ms}ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    #[error("{source_name}: network error: {message}")]
    Network { source_name: String, message: String },

    #[error("{source_name}: invalid response: {message}")]
    Parse { source_name: String, message: String },

    #[error("{source_name}: I/O error: {message}")]
    Io { source_name: String, message: String },

    #[error("query was cancelled")]
    Cancelled,
}

/// A place packages can be looked up: a local directory, a remote index, or
/// any future ecosystem-specific backend.
///
/// "Not found" is a successful answer (`Ok(None)` or an empty list); `Err`
/// is reserved for the source itself misbehaving.
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Source name, used in diagnostics and in resolved output.
    fn name(&self) -> &str;

    /// Upper bound the fan-out applies to every call on this source.
    fn timeout(&self) -> Duration;

    /// Metadata for exactly `id@version`.
    async fn get_metadata(
        &self,
        id: &str,
        version: &str,
    ) -> Result<Option<PackageMetadata>, SourceError>;

    /// Every published version of `id`, newest first.
    async fn get_versions(
        &self,
        id: &str,
        include_prerelease: bool,
    ) -> Result<Vec<String>, SourceError>;
}

/// Drop prereleases unless asked for, then order newest first.
pub fn normalize_versions(mut versions: Vec<String>, include_prerelease: bool) -> Vec<String> {
    if !include_prerelease {
        versions.retain(|v| !version::parse_version(v).is_prerelease());
    }
    version::sort_newest_first(&mut versions);
    versions
}

/// Reject ids that could escape a source's namespace.
pub(crate) fn validate_id(source_name: &str, id: &str) -> Result<(), SourceError> {
    let bad = id.is_empty()
        || id.starts_with('/')
        || id.contains('\\')
        || id.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(SourceError::Parse {
            source_name: source_name.to_string(),
            message: format!("invalid package id '{id}'"),
        });
    }
    Ok(())
}
