//! Scripted in-memory sources and catalogs for resolver tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use depot_core::package::{CatalogEntry, Language, PackageDependency, PackageMetadata};
use depot_resolver::catalog::{Catalog, MemoryCatalog};
use depot_source::source::normalize_versions;
use depot_source::{PackageSource, SourceError};

/// Install a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// A source answering from fixed tables after an optional delay.
pub struct ScriptedSource {
    name: String,
    timeout: Duration,
    delay: Duration,
    failure: Option<String>,
    listing_failure: Option<String>,
    metadata: HashMap<String, PackageMetadata>,
    versions: HashMap<String, Vec<String>>,
    pub started: Arc<AtomicUsize>,
    pub completed: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            timeout: Duration::from_secs(5),
            delay: Duration::ZERO,
            failure: None,
            listing_failure: None,
            metadata: HashMap::new(),
            versions: HashMap::new(),
            started: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish `id@version` with the given dependencies.
    pub fn package(mut self, id: &str, version: &str, deps: Vec<PackageDependency>) -> Self {
        let mut meta = PackageMetadata::new(id, version);
        meta.dependencies = deps;
        self.metadata.insert(meta.key(), meta);
        self.versions
            .entry(id.to_string())
            .or_default()
            .push(version.to_string());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Every call fails with a network error.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Metadata answers normally; every version listing fails.
    pub fn failing_listings(mut self, message: &str) -> Self {
        self.listing_failure = Some(message.to_string());
        self
    }

    pub fn shared(self) -> Arc<dyn PackageSource> {
        Arc::new(self)
    }

    async fn enter(&self) -> Result<(), SourceError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(ref message) => Err(SourceError::Network {
                source_name: self.name.clone(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PackageSource for ScriptedSource {
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
        self.enter().await?;
        Ok(self.metadata.get(&format!("{id}@{version}")).cloned())
    }

    async fn get_versions(
        &self,
        id: &str,
        include_prerelease: bool,
    ) -> Result<Vec<String>, SourceError> {
        self.enter().await?;
        if let Some(ref message) = self.listing_failure {
            return Err(SourceError::Network {
                source_name: self.name.clone(),
                message: message.clone(),
            });
        }
        let versions = self.versions.get(id).cloned().unwrap_or_default();
        Ok(normalize_versions(versions, include_prerelease))
    }
}

pub fn req(id: &str, range: &str) -> PackageDependency {
    PackageDependency::required(id, range)
}

pub fn opt(id: &str, range: &str) -> PackageDependency {
    PackageDependency::optional(id, range)
}

pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
}

pub fn published(id: &str, version: &str, on: u32, deps: Vec<PackageDependency>) -> CatalogEntry {
    let mut meta = PackageMetadata::new(id, version);
    meta.dependencies = deps;
    CatalogEntry::new(meta, day(on), Language::Generic)
}

/// Wraps a catalog and counts lookups.
pub struct CountingCatalog {
    inner: MemoryCatalog,
    pub lookups: Arc<AtomicUsize>,
}

impl CountingCatalog {
    pub fn new(inner: MemoryCatalog) -> Self {
        Self {
            inner,
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Catalog for CountingCatalog {
    async fn find_best_matching_version(
        &self,
        id: &str,
        version_range: &str,
        language: Language,
    ) -> Option<CatalogEntry> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner
            .find_best_matching_version(id, version_range, language)
            .await
    }
}
