//! Lookups against packages already published to this registry.

use std::cmp::Ordering;

use async_trait::async_trait;
use depot_core::package::{CatalogEntry, Language};
use depot_core::version;

/// Read access to the published-package catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// The published version of `id` that best satisfies `version_range`.
    async fn find_best_matching_version(
        &self,
        id: &str,
        version_range: &str,
        language: Language,
    ) -> Option<CatalogEntry>;
}

/// Catalog held in memory.
///
/// Among entries satisfying the range, the most recently published wins;
/// equal timestamps fall back to the higher version.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: Vec<CatalogEntry>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CatalogEntry> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn newer(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    a.published_at
        .cmp(&b.published_at)
        .then_with(|| version::compare_versions(a.version(), b.version()))
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_best_matching_version(
        &self,
        id: &str,
        version_range: &str,
        language: Language,
    ) -> Option<CatalogEntry> {
        let range = version::parse_version_range(version_range);
        self.entries
            .iter()
            .filter(|e| e.id() == id && e.language == language)
            .filter(|e| range.contains(&version::parse_version(e.version())))
            .max_by(|a, b| newer(a, b))
            .cloned()
    }
}
