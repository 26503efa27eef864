//! Dependency tree and graph views over the published-package catalog.
//!
//! [`DependencyGraphBuilder::build_tree`] walks the catalog from a root
//! package down to a caller-chosen depth, truncating cycles the same way the
//! resolver does. [`build_graph`] projects that tree onto a deduplicated
//! node list and a per-relation edge list backed by petgraph.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use depot_core::config::{ResolverConfig, DEFAULT_MAX_DEPTH};
use depot_core::package::{package_key, CatalogEntry, Language, PackageDependency};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use tracing::Instrument;

use crate::catalog::Catalog;
use crate::error::{ResolveError, MAX_TREE_DEPTH, MIN_TREE_DEPTH};
use crate::path::PathSet;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One node of the dependency tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyTreeNode {
    pub package_id: String,
    /// Concrete version, or the declared range when nothing was resolved.
    pub version: String,
    pub version_range: String,
    /// The catalog had a matching version and the node was looked up.
    pub is_resolved: bool,
    /// The node closes a cycle and was not expanded.
    pub is_circular: bool,
    pub depth: usize,
    pub children: Vec<DependencyTreeNode>,
}

impl DependencyTreeNode {
    pub fn key(&self) -> String {
        package_key(&self.package_id, &self.version)
    }

    fn unresolved(dep: &PackageDependency, depth: usize) -> Self {
        Self {
            package_id: dep.package_id.clone(),
            version: dep.version_range.clone(),
            version_range: dep.version_range.clone(),
            is_resolved: false,
            is_circular: false,
            depth,
            children: Vec::new(),
        }
    }

    /// Pre-order iterator over this node and all descendants.
    pub fn iter(&self) -> impl Iterator<Item = &DependencyTreeNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

impl fmt::Display for DependencyTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package_id, self.version)?;
        if self.is_circular {
            f.write_str(" (circular)")?;
        } else if !self.is_resolved {
            f.write_str(" (unresolved)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyTreeResponse {
    pub package_id: String,
    pub version: String,
    /// Distinct resolved `id@version` pairs below the root.
    pub total_dependencies: usize,
    pub max_depth: usize,
    pub has_circular_dependencies: bool,
    pub circular_paths: Vec<String>,
    pub root_node: DependencyTreeNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraphNode {
    /// `packageId@version`.
    pub id: String,
    pub package_id: String,
    pub version: String,
    pub level: usize,
    pub is_root: bool,
    pub is_circular: bool,
}

impl fmt::Display for DependencyGraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraphEdge {
    pub from: String,
    pub to: String,
    pub version_range: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraphResponse {
    pub nodes: Vec<DependencyGraphNode>,
    pub edges: Vec<DependencyGraphEdge>,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub has_circular_dependencies: bool,
    pub circular_paths: Vec<String>,
}

/// Reject depths outside `[1, 50]` before any traversal starts.
pub fn validate_max_depth(max_depth: usize) -> Result<(), ResolveError> {
    if (MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&max_depth) {
        Ok(())
    } else {
        Err(ResolveError::DepthExceeded { max_depth })
    }
}

/// Traversal bookkeeping shared by one `build_tree` call.
#[derive(Default)]
struct TreeState {
    circular_paths: Vec<String>,
    resolved_keys: HashSet<String>,
}

/// Builds dependency trees and graphs from the catalog.
pub struct DependencyGraphBuilder {
    catalog: Arc<dyn Catalog>,
    language: Language,
    default_max_depth: usize,
}

impl DependencyGraphBuilder {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            language: Language::default(),
            default_max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_config(catalog: Arc<dyn Catalog>, config: &ResolverConfig) -> Self {
        Self::new(catalog).with_default_depth(config.default_max_depth)
    }

    /// Depth used when the caller does not pick one.
    pub fn with_default_depth(mut self, max_depth: usize) -> Self {
        self.default_max_depth = max_depth;
        self
    }

    /// Ecosystem passed to every catalog lookup.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Build the dependency tree of `package_id@version`, `max_depth` levels
    /// deep. Nodes at the cutoff are kept but not looked up.
    pub async fn build_tree(
        &self,
        package_id: &str,
        version: &str,
        max_depth: usize,
    ) -> Result<DependencyTreeResponse, ResolveError> {
        validate_max_depth(max_depth)?;
        let span = tracing::info_span!(
            "dependency_tree",
            root = %package_key(package_id, version),
            max_depth
        );
        async move {
            let root = self
                .catalog
                .find_best_matching_version(package_id, version, self.language)
                .await
                .ok_or_else(|| ResolveError::NotFound {
                    package_id: package_id.to_string(),
                    version: version.to_string(),
                    diagnostics: Some(format!("not published as a {} package", self.language)),
                })?;

            let mut state = TreeState::default();
            let root_node = self
                .expand(root, version.to_string(), 0, max_depth, &PathSet::new(), &mut state)
                .await;

            state.resolved_keys.remove(&root_node.key());
            tracing::debug!(
                "tree for {} has {} dependencies, {} cycles",
                root_node.key(),
                state.resolved_keys.len(),
                state.circular_paths.len()
            );
            Ok(DependencyTreeResponse {
                package_id: root_node.package_id.clone(),
                version: root_node.version.clone(),
                total_dependencies: state.resolved_keys.len(),
                max_depth,
                has_circular_dependencies: !state.circular_paths.is_empty(),
                circular_paths: state.circular_paths,
                root_node,
            })
        }
        .instrument(span)
        .await
    }

    /// [`DependencyGraphBuilder::build_tree`] at the configured default depth.
    pub async fn build_default_tree(
        &self,
        package_id: &str,
        version: &str,
    ) -> Result<DependencyTreeResponse, ResolveError> {
        self.build_tree(package_id, version, self.default_max_depth)
            .await
    }

    /// Build the tree, then project it onto a graph.
    pub async fn build_dependency_graph(
        &self,
        package_id: &str,
        version: &str,
        max_depth: usize,
    ) -> Result<DependencyGraphResponse, ResolveError> {
        let tree = self.build_tree(package_id, version, max_depth).await?;
        Ok(build_graph(&tree))
    }

    /// Every cycle reachable from `package_id@version`, as
    /// `A@1.0 -> B@2.0 -> A@1.0` strings.
    pub async fn detect_circular_dependencies(
        &self,
        package_id: &str,
        version: &str,
    ) -> Result<Vec<String>, ResolveError> {
        let tree = self.build_tree(package_id, version, MAX_TREE_DEPTH).await?;
        Ok(tree.circular_paths)
    }

    /// Node for a resolved catalog entry, with its children expanded.
    fn expand<'a>(
        &'a self,
        entry: CatalogEntry,
        version_range: String,
        depth: usize,
        max_depth: usize,
        path: &'a PathSet,
        state: &'a mut TreeState,
    ) -> BoxFuture<'a, DependencyTreeNode> {
        Box::pin(async move {
            let key = package_key(entry.id(), entry.version());
            state.resolved_keys.insert(key.clone());
            let path = path.with(&key);

            let mut children = Vec::with_capacity(entry.metadata.dependencies.len());
            for dep in &entry.metadata.dependencies {
                let child = self.child_node(dep, depth + 1, max_depth, &path, state).await;
                children.push(child);
            }

            DependencyTreeNode {
                package_id: entry.metadata.id,
                version: entry.metadata.version,
                version_range,
                is_resolved: true,
                is_circular: false,
                depth,
                children,
            }
        })
    }

    async fn child_node(
        &self,
        dep: &PackageDependency,
        depth: usize,
        max_depth: usize,
        path: &PathSet,
        state: &mut TreeState,
    ) -> DependencyTreeNode {
        if depth >= max_depth {
            return DependencyTreeNode::unresolved(dep, depth);
        }

        let Some(entry) = self
            .catalog
            .find_best_matching_version(&dep.package_id, &dep.version_range, self.language)
            .await
        else {
            tracing::debug!("{} not in catalog", dep.edge_key());
            return DependencyTreeNode::unresolved(dep, depth);
        };

        let key = package_key(entry.id(), entry.version());
        if path.contains(&key) {
            if let Some(cycle) = path.cycle_through(&key) {
                tracing::debug!("circular dependency: {cycle}");
                if !state.circular_paths.contains(&cycle) {
                    state.circular_paths.push(cycle);
                }
            }
            return DependencyTreeNode {
                package_id: entry.metadata.id,
                version: entry.metadata.version,
                version_range: dep.version_range.clone(),
                is_resolved: true,
                is_circular: true,
                depth,
                children: Vec::new(),
            };
        }

        self.expand(entry, dep.version_range.clone(), depth, max_depth, path, state)
            .await
    }
}

/// Project a tree onto its graph view.
///
/// Nodes are deduplicated by `id@version` (first occurrence wins); every
/// parent-to-child relation becomes its own edge.
pub fn build_graph(tree: &DependencyTreeResponse) -> DependencyGraphResponse {
    DependencyGraph::from_tree(&tree.root_node).to_response(&tree.circular_paths)
}

/// Render a tree with box-drawing connectors, one node per line.
pub fn render_tree(root: &DependencyTreeNode) -> String {
    let mut output = format!("{root}\n");
    let count = root.children.len();
    for (i, child) in root.children.iter().enumerate() {
        render_subtree(&mut output, child, "", i == count - 1);
    }
    output
}

fn render_subtree(output: &mut String, node: &DependencyTreeNode, prefix: &str, is_last: bool) {
    let connector = if is_last { "└── " } else { "├── " };
    output.push_str(&format!("{prefix}{connector}{node}\n"));

    let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        render_subtree(output, child, &child_prefix, i == count - 1);
    }
}

/// A dependency graph backed by petgraph. Parallel edges are allowed.
pub struct DependencyGraph {
    graph: DiGraph<DependencyGraphNode, String>,
    /// Lookup from `id@version` to node index.
    index: HashMap<String, NodeIndex>,
    pub root: Option<NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            root: None,
        }
    }

    /// Build the graph from a tree, walking it in pre-order.
    pub fn from_tree(root: &DependencyTreeNode) -> Self {
        let mut g = Self::new();
        let root_idx = g.add_node(graph_node(root, true));
        g.set_root(root_idx);
        g.add_children(root_idx, root);
        g
    }

    fn add_children(&mut self, parent: NodeIndex, node: &DependencyTreeNode) {
        for child in &node.children {
            let idx = self.add_node(graph_node(child, false));
            self.add_edge(parent, idx, child.version_range.clone());
            self.add_children(idx, child);
        }
    }

    /// Add or retrieve a node. If the id already exists, returns the existing index.
    pub fn add_node(&mut self, node: DependencyGraphNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    pub fn set_root(&mut self, idx: NodeIndex) {
        self.root = Some(idx);
    }

    /// Add a dependency edge from `from` to `to` labelled with the declared range.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, version_range: String) {
        self.graph.add_edge(from, to, version_range);
    }

    /// Look up a node by `id@version`.
    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &DependencyGraphNode {
        &self.graph[idx]
    }

    /// Direct dependencies of a node.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .collect()
    }

    /// Reverse dependencies (who depends on this node).
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.source())
            .collect()
    }

    /// Find the path from the root to a node.
    ///
    /// Accepts either `id@version` or a bare package id.
    pub fn find_path(&self, target_key: &str) -> Option<Vec<&DependencyGraphNode>> {
        let root = self.root?;
        let target = self.resolve_key(target_key)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    /// Exact `id@version` first, then the first node with that package id.
    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        if let Some(&idx) = self.index.get(key) {
            return Some(idx);
        }
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].package_id == key)
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for next in self.dependencies_of(current) {
            if self.dfs_path(next, target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Flatten into the response shape, nodes and edges in insertion order.
    pub fn to_response(&self, circular_paths: &[String]) -> DependencyGraphResponse {
        let nodes: Vec<DependencyGraphNode> = self
            .graph
            .node_indices()
            .map(|idx| self.graph[idx].clone())
            .collect();
        let edges: Vec<DependencyGraphEdge> = self
            .graph
            .edge_references()
            .map(|e| DependencyGraphEdge {
                from: self.graph[e.source()].id.clone(),
                to: self.graph[e.target()].id.clone(),
                version_range: e.weight().clone(),
            })
            .collect();
        DependencyGraphResponse {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            nodes,
            edges,
            has_circular_dependencies: !circular_paths.is_empty(),
            circular_paths: circular_paths.to_vec(),
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn graph_node(node: &DependencyTreeNode, is_root: bool) -> DependencyGraphNode {
    DependencyGraphNode {
        id: node.key(),
        package_id: node.package_id.clone(),
        version: node.version.clone(),
        level: node.depth,
        is_root,
        is_circular: node.is_circular,
    }
}
