//! Filesystem source mirroring the registry layout on disk.
//!
//! ```text
//! <root>/<id>/<version>/metadata.json
//! ```
//!
//! Scoped ids such as `@types/node` nest one directory deeper.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use depot_core::package::PackageMetadata;
use depot_util::fs;

use crate::source::{normalize_versions, validate_id, PackageSource, SourceError};

pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone)]
pub struct LocalSource {
    name: String,
    root: PathBuf,
    timeout: Duration,
}

impl LocalSource {
    pub fn new(name: &str, root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            root: root.into(),
            timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    pub fn metadata_path(&self, id: &str, version: &str) -> PathBuf {
        self.package_dir(id).join(version).join(METADATA_FILE)
    }

    /// Write metadata into the tree, creating directories as needed.
    pub fn put(&self, metadata: &PackageMetadata) -> Result<PathBuf, SourceError> {
        validate_id(&self.name, &metadata.id)?;
        let path = self.metadata_path(&metadata.id, &metadata.version);
        let json = serde_json::to_string_pretty(metadata).map_err(|e| self.parse_err(e))?;
        if let Some(dir) = path.parent() {
            fs::ensure_dir(dir).map_err(|e| self.io_err(e))?;
        }
        std::fs::write(&path, json).map_err(|e| self.io_err(e))?;
        Ok(path)
    }

    fn io_err(&self, e: std::io::Error) -> SourceError {
        SourceError::Io {
            source_name: self.name.clone(),
            message: e.to_string(),
        }
    }

    fn parse_err(&self, e: serde_json::Error) -> SourceError {
        SourceError::Parse {
            source_name: self.name.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl PackageSource for LocalSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_metadata(
        &self,
        id: &str,
        version: &str,
    ) -> Result<Option<PackageMetadata>, SourceError> {
        validate_id(&self.name, id)?;
        validate_id(&self.name, version)?;
        let path = self.metadata_path(id, version);
        let Some(content) = fs::read_optional(&path).map_err(|e| self.io_err(e))? else {
            tracing::trace!("{}: no metadata at {}", self.name, path.display());
            return Ok(None);
        };
        let meta = PackageMetadata::from_json(&content).map_err(|e| self.parse_err(e))?;
        Ok(Some(meta))
    }

    async fn get_versions(
        &self,
        id: &str,
        include_prerelease: bool,
    ) -> Result<Vec<String>, SourceError> {
        validate_id(&self.name, id)?;
        let dir = self.package_dir(id);
        let versions: Vec<String> = fs::list_subdirs(&dir)
            .map_err(|e| self.io_err(e))?
            .into_iter()
            .filter(|v| dir.join(v).join(METADATA_FILE).is_file())
            .collect();
        Ok(normalize_versions(versions, include_prerelease))
    }
}
