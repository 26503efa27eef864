use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A dependency declared by a package: target id, version range, and
/// whether failing to satisfy it should abort resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDependency {
    pub package_id: String,
    #[serde(default = "default_range")]
    pub version_range: String,
    #[serde(default = "default_required")]
    pub is_required: bool,
}

fn default_range() -> String {
    "*".to_string()
}

fn default_required() -> bool {
    true
}

impl PackageDependency {
    pub fn required(package_id: &str, version_range: &str) -> Self {
        Self {
            package_id: package_id.to_string(),
            version_range: version_range.to_string(),
            is_required: true,
        }
    }

    pub fn optional(package_id: &str, version_range: &str) -> Self {
        Self {
            package_id: package_id.to_string(),
            version_range: version_range.to_string(),
            is_required: false,
        }
    }

    /// `id@range` key identifying this declared edge.
    pub fn edge_key(&self) -> String {
        format!("{}@{}", self.package_id, self.version_range)
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package_id, self.version_range)?;
        if !self.is_required {
            f.write_str(" (optional)")?;
        }
        Ok(())
    }
}

/// The minimal package description a source returns for `id@version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
}

impl PackageMetadata {
    pub fn new(id: &str, version: &str) -> Self {
        Self {
            id: id.to_string(),
            version: version.to_string(),
            dependencies: Vec::new(),
        }
    }

    /// Builder-style helper to append a dependency.
    pub fn with_dependency(mut self, dep: PackageDependency) -> Self {
        self.dependencies.push(dep);
        self
    }

    /// `id@version` key.
    pub fn key(&self) -> String {
        package_key(&self.id, &self.version)
    }

    /// Parse metadata from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Ecosystem a published package belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Python,
    Rust,
    #[default]
    Generic,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Javascript => "javascript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Generic => "generic",
        };
        f.write_str(s)
    }
}

/// A package version already published to the local catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub metadata: PackageMetadata,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub language: Language,
}

impl CatalogEntry {
    pub fn new(metadata: PackageMetadata, published_at: DateTime<Utc>, language: Language) -> Self {
        Self {
            metadata,
            published_at,
            language,
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }
}

/// Build the `id@version` key used throughout resolution bookkeeping.
pub fn package_key(id: &str, version: &str) -> String {
    format!("{id}@{version}")
}
