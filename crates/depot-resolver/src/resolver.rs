//! Core dependency resolution algorithm: depth-first descent from a root
//! package, one concurrent source fan-out per lookup, cycle truncation, and
//! required/optional failure handling.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use depot_core::config::ResolverConfig;
use depot_core::package::{package_key, PackageDependency, PackageMetadata};
use depot_core::version::{self, VersionRange};
use depot_source::PackageSource;
use serde::Serialize;
use tracing::Instrument;

use crate::conflict::{Conflict, ConflictReport};
use crate::error::ResolveError;
use crate::fanout::{self, FanoutOutcome};
use crate::path::PathSet;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The output of one resolve call. Never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResult {
    pub success: bool,
    pub message: String,
    pub resolved_dependencies: Vec<ConcreteDependency>,
    pub conflicts: Vec<String>,
    /// Per-source failures seen along the way. Diagnostic only.
    pub source_errors: Vec<String>,
}

/// A dependency pinned to a concrete version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcreteDependency {
    pub package_id: String,
    pub version: String,
    /// The range as declared by the dependent package.
    pub version_range: String,
    /// Source whose version listing supplied `version`.
    pub source_name: String,
    pub is_required: bool,
}

impl ConcreteDependency {
    pub fn key(&self) -> String {
        package_key(&self.package_id, &self.version)
    }
}

/// A successful resolution: the flat set plus any soft conflicts.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub dependencies: Vec<ConcreteDependency>,
    pub conflicts: Vec<String>,
    pub source_errors: Vec<String>,
}

/// Result of visiting one package.
enum Visit {
    /// The package was already on the active path.
    Truncated,
    /// The package was expanded; these are its transitive dependencies.
    Expanded(Vec<ConcreteDependency>),
}

/// Call-scoped bookkeeping, mutated only by the orchestrating task.
#[derive(Default)]
struct ResolveState {
    /// `id@declaredRange` edges already handled in this call.
    resolved_edges: HashSet<String>,
    /// First concrete version chosen per package id.
    selected: HashMap<String, String>,
    conflicts: ConflictReport,
    source_errors: Vec<String>,
}

impl ResolveState {
    fn record_errors<T>(&mut self, outcome: &FanoutOutcome<T>) {
        self.source_errors
            .extend(outcome.errors().map(ToString::to_string));
    }
}

/// Resolves a root package against an ordered list of sources.
///
/// Source order is significant: whenever more than one source can answer,
/// the one listed first wins.
pub struct Resolver {
    sources: Vec<Arc<dyn PackageSource>>,
    include_prerelease: bool,
}

impl Resolver {
    pub fn new(sources: Vec<Arc<dyn PackageSource>>) -> Self {
        Self {
            sources,
            include_prerelease: false,
        }
    }

    pub fn with_config(sources: Vec<Arc<dyn PackageSource>>, config: &ResolverConfig) -> Self {
        Self::new(sources).include_prerelease(config.include_prerelease)
    }

    /// Whether prerelease versions are candidates when matching ranges.
    pub fn include_prerelease(mut self, include: bool) -> Self {
        self.include_prerelease = include;
        self
    }

    pub fn sources(&self) -> &[Arc<dyn PackageSource>] {
        &self.sources
    }

    /// Resolve `root_id@root_version` into a flat dependency set.
    ///
    /// Never fails: hard failures come back as `success == false` with the
    /// conflicts gathered up to that point.
    pub async fn resolve(&self, root_id: &str, root_version: &str) -> ResolveResult {
        let mut state = ResolveState::default();
        let outcome = self.run(root_id, root_version, &mut state).await;
        if !state.conflicts.is_empty() {
            tracing::debug!("{}", state.conflicts);
        }
        let conflicts = state.conflicts.messages();

        match outcome {
            Ok(dependencies) => {
                tracing::info!(
                    "resolved {root_id}@{root_version}: {} dependencies, {} conflicts",
                    dependencies.len(),
                    state.conflicts.len()
                );
                ResolveResult {
                    success: true,
                    message: format!(
                        "Resolved {} dependencies for {root_id}@{root_version}",
                        dependencies.len()
                    ),
                    resolved_dependencies: dependencies,
                    conflicts,
                    source_errors: state.source_errors,
                }
            }
            Err(err) => {
                tracing::info!("resolution of {root_id}@{root_version} failed: {err}");
                ResolveResult {
                    success: false,
                    message: err.to_string(),
                    resolved_dependencies: Vec::new(),
                    conflicts,
                    source_errors: state.source_errors,
                }
            }
        }
    }

    /// Same algorithm as [`Resolver::resolve`], surfacing the typed error.
    pub async fn try_resolve(
        &self,
        root_id: &str,
        root_version: &str,
    ) -> Result<Resolution, ResolveError> {
        let mut state = ResolveState::default();
        let dependencies = self.run(root_id, root_version, &mut state).await?;
        Ok(Resolution {
            dependencies,
            conflicts: state.conflicts.messages(),
            source_errors: state.source_errors,
        })
    }

    async fn run(
        &self,
        root_id: &str,
        root_version: &str,
        state: &mut ResolveState,
    ) -> Result<Vec<ConcreteDependency>, ResolveError> {
        if self.sources.is_empty() {
            return Err(ResolveError::InvalidSource {
                message: "no package sources are enabled".to_string(),
            });
        }
        let span = tracing::info_span!("resolve", root = %package_key(root_id, root_version));
        async move {
            state
                .selected
                .insert(root_id.to_string(), root_version.to_string());
            let visit = self
                .visit(root_id, root_version, &PathSet::new(), state)
                .await?;
            let dependencies = match visit {
                Visit::Expanded(deps) => dedup_by_key(deps),
                Visit::Truncated => Vec::new(),
            };
            Ok(dependencies)
        }
        .instrument(span)
        .await
    }

    /// Expand one package: fetch its metadata, pin each declared dependency
    /// to a concrete version, and recurse.
    fn visit<'a>(
        &'a self,
        id: &'a str,
        version: &'a str,
        path: &'a PathSet,
        state: &'a mut ResolveState,
    ) -> BoxFuture<'a, Result<Visit, ResolveError>> {
        Box::pin(async move {
            let key = package_key(id, version);
            if path.contains(&key) {
                tracing::debug!("cycle at {key}, truncating branch");
                return Ok(Visit::Truncated);
            }
            let path = path.with(&key);

            let metadata = self.fetch_metadata(id, version, state).await?;
            let mut collected = Vec::new();

            for dep in &metadata.dependencies {
                let edge_key = dep.edge_key();
                if state.resolved_edges.contains(&edge_key) {
                    continue;
                }
                let range = version::parse_version_range(&dep.version_range);

                if let Some(existing) = state.selected.get(&dep.package_id) {
                    if range.contains(&version::parse_version(existing)) {
                        tracing::debug!(
                            "{edge_key} already satisfied by {}@{existing}",
                            dep.package_id
                        );
                        state.resolved_edges.insert(edge_key);
                        continue;
                    }
                }

                let (source_name, concrete) = match self
                    .find_concrete_version(dep, &range, state)
                    .await
                {
                    Ok(found) => found,
                    Err(err) => {
                        state.conflicts.add(Conflict {
                            package_id: dep.package_id.clone(),
                            range: dep.version_range.clone(),
                            required_by: key.clone(),
                            required: dep.is_required,
                            reason: err.to_string(),
                        });
                        if let ResolveError::NotFound { .. } = err {
                            return Err(err);
                        }
                        if dep.is_required {
                            return Err(ResolveError::DependencyResolutionFailed {
                                package_id: dep.package_id.clone(),
                                range: dep.version_range.clone(),
                                conflicts: state.conflicts.messages(),
                            });
                        }
                        tracing::warn!("skipping optional dependency {edge_key} of {key}: {err}");
                        continue;
                    }
                };

                if let Some(existing) = state.selected.get(&dep.package_id) {
                    state.conflicts.add(Conflict {
                        package_id: dep.package_id.clone(),
                        range: dep.version_range.clone(),
                        required_by: key.clone(),
                        required: dep.is_required,
                        reason: format!(
                            "{existing} already selected does not satisfy the range; also using {concrete}"
                        ),
                    });
                } else {
                    state
                        .selected
                        .insert(dep.package_id.clone(), concrete.clone());
                }

                tracing::debug!("{key}: {edge_key} -> {concrete} from {source_name}");
                let visit = self.visit(&dep.package_id, &concrete, &path, state).await?;
                if let Visit::Expanded(children) = visit {
                    collected.push(ConcreteDependency {
                        package_id: dep.package_id.clone(),
                        version: concrete,
                        version_range: dep.version_range.clone(),
                        source_name,
                        is_required: dep.is_required,
                    });
                    collected.extend(children);
                }
                state.resolved_edges.insert(edge_key);
            }

            Ok(Visit::Expanded(collected))
        })
    }

    /// Metadata for `id@version` from the first source, in declared order,
    /// that has it.
    async fn fetch_metadata(
        &self,
        id: &str,
        version: &str,
        state: &mut ResolveState,
    ) -> Result<PackageMetadata, ResolveError> {
        let outcome = fanout::query(&self.sources, {
            let id = id.to_string();
            let version = version.to_string();
            move |source| {
                let id = id.clone();
                let version = version.clone();
                async move { source.get_metadata(&id, &version).await }
            }
        })
        .await;
        state.record_errors(&outcome);

        let diagnostics = outcome.joined_errors();
        match outcome.into_first_value() {
            Some((source_name, metadata)) => {
                tracing::trace!("metadata for {id}@{version} from {source_name}");
                Ok(metadata)
            }
            None => Err(ResolveError::NotFound {
                package_id: id.to_string(),
                version: version.to_string(),
                diagnostics,
            }),
        }
    }

    /// Walk sources in declared order and take the first version in the
    /// first source's listing that satisfies `range`.
    ///
    /// Returns `(source_name, version)`. `NotFound` when every source failed
    /// the lookup, `Unsatisfiable` when the listings had no match.
    async fn find_concrete_version(
        &self,
        dep: &PackageDependency,
        range: &VersionRange,
        state: &mut ResolveState,
    ) -> Result<(String, String), ResolveError> {
        let include_prerelease = self.include_prerelease;
        let outcome = fanout::query(&self.sources, {
            let id = dep.package_id.clone();
            move |source| {
                let id = id.clone();
                async move {
                    source
                        .get_versions(&id, include_prerelease)
                        .await
                        .map(Some)
                }
            }
        })
        .await;
        state.record_errors(&outcome);

        if outcome.all_failed() {
            return Err(ResolveError::NotFound {
                package_id: dep.package_id.clone(),
                version: dep.version_range.clone(),
                diagnostics: outcome.joined_errors(),
            });
        }
        outcome
            .entries
            .into_iter()
            .find_map(|entry| {
                let versions = entry.value?;
                let source_name = entry.source_name;
                versions
                    .into_iter()
                    .find(|v| version::is_version_in_range(v, range))
                    .map(|v| (source_name, v))
            })
            .ok_or_else(|| ResolveError::Unsatisfiable {
                package_id: dep.package_id.clone(),
                range: dep.version_range.clone(),
            })
    }
}

/// Keep the first occurrence of each `id@version`.
fn dedup_by_key(deps: Vec<ConcreteDependency>) -> Vec<ConcreteDependency> {
    let mut seen = HashSet::new();
    deps.into_iter().filter(|d| seen.insert(d.key())).collect()
}
