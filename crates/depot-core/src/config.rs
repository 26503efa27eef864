use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use depot_util::errors::DepotError;

/// Default per-source request timeout in milliseconds.
pub const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 10_000;

/// Default traversal depth for dependency tree requests.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// User configuration loaded from `~/.depot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepotConfig {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Kind of backend a `[[sources]]` entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A directory tree of `<id>/<version>/metadata.json` files.
    Local,
    /// A remote JSON index reachable over HTTP(S).
    Http,
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    /// Directory path for `local`, base URL for `http`.
    pub location: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lower values are queried (and preferred) first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default, rename = "timeout-ms")]
    pub timeout_ms: Option<u64>,
    /// Bearer token sent to `http` sources.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Resolution settings from `[resolver]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default, rename = "include-prerelease")]
    pub include_prerelease: bool,
    #[serde(default = "default_max_depth", rename = "default-max-depth")]
    pub default_max_depth: usize,
    #[serde(default = "default_source_timeout", rename = "source-timeout-ms")]
    pub source_timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            include_prerelease: false,
            default_max_depth: default_max_depth(),
            source_timeout_ms: default_source_timeout(),
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_source_timeout() -> u64 {
    DEFAULT_SOURCE_TIMEOUT_MS
}

impl DepotConfig {
    /// Load the configuration from `~/.depot/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::from_path(&path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load and parse a config file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DepotError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            DepotError::Config {
                message: format!("Failed to parse config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Enabled sources in query order: ascending priority, file order on ties.
    pub fn enabled_sources(&self) -> Vec<&SourceConfig> {
        let mut enabled: Vec<&SourceConfig> = self.sources.iter().filter(|s| s.enabled).collect();
        enabled.sort_by_key(|s| s.priority);
        enabled
    }

    /// Effective timeout for a source, falling back to `[resolver]`.
    pub fn source_timeout_ms(&self, source: &SourceConfig) -> u64 {
        source.timeout_ms.unwrap_or(self.resolver.source_timeout_ms)
    }
}

/// Returns the path to the depot data directory (`~/.depot/`).
pub fn dirs_path() -> PathBuf {
    depot_util::fs::home_dir().join(".depot")
}
