mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{published, req, CountingCatalog};
use depot_core::package::{CatalogEntry, Language, PackageMetadata};
use depot_resolver::catalog::MemoryCatalog;
use depot_resolver::graph::{build_graph, render_tree, DependencyGraph, DependencyGraphBuilder};
use depot_resolver::ResolveError;

fn builder(entries: Vec<CatalogEntry>) -> DependencyGraphBuilder {
    let catalog: MemoryCatalog = entries.into_iter().collect();
    DependencyGraphBuilder::new(Arc::new(catalog))
}

fn cyclic() -> Vec<CatalogEntry> {
    vec![
        published("A", "1.0", 1, vec![req("B", "2.0")]),
        published("B", "2.0", 1, vec![req("A", "1.0")]),
    ]
}

#[tokio::test]
async fn test_depth_out_of_bounds_rejected_before_lookup() {
    let catalog = CountingCatalog::new(cyclic().into_iter().collect());
    let lookups = Arc::clone(&catalog.lookups);
    let builder = DependencyGraphBuilder::new(Arc::new(catalog));

    for depth in [0, 51] {
        let err = builder.build_tree("A", "1.0", depth).await.unwrap_err();
        assert_eq!(err, ResolveError::DepthExceeded { max_depth: depth });
        assert!(err.to_string().contains("between 1 and 50"));
        assert!(builder.build_dependency_graph("A", "1.0", depth).await.is_err());
    }
    assert_eq!(lookups.load(Ordering::SeqCst), 0);

    assert!(builder.build_tree("A", "1.0", 1).await.is_ok());
    assert!(builder.build_tree("A", "1.0", 50).await.is_ok());
}

#[tokio::test]
async fn test_depth_one_keeps_children_as_placeholders() {
    let catalog = CountingCatalog::new(
        vec![
            published("app", "1.0", 1, vec![req("lib", "1.*"), req("B", "2.0")]),
            published("B", "2.0", 1, vec![req("app", "1.0")]),
        ]
        .into_iter()
        .collect(),
    );
    let lookups = Arc::clone(&catalog.lookups);
    let builder = DependencyGraphBuilder::new(Arc::new(catalog));

    let tree = builder.build_tree("app", "1.0", 1).await.unwrap();
    assert_eq!(lookups.load(Ordering::SeqCst), 1);
    assert_eq!(tree.root_node.children.len(), 2);
    for child in &tree.root_node.children {
        assert_eq!(child.depth, 1);
        assert!(!child.is_resolved);
        assert!(!child.is_circular);
        assert!(child.children.is_empty());
    }
    assert_eq!(tree.total_dependencies, 0);
    assert!(!tree.has_circular_dependencies);
}

#[tokio::test]
async fn test_cycle_is_marked_and_reported() {
    let builder = builder(cyclic());
    let tree = builder.build_tree("A", "1.0", 10).await.unwrap();

    assert!(tree.has_circular_dependencies);
    assert_eq!(tree.circular_paths, vec!["A@1.0 -> B@2.0 -> A@1.0"]);
    assert_eq!(tree.total_dependencies, 1);

    let b = &tree.root_node.children[0];
    assert_eq!(b.key(), "B@2.0");
    assert!(b.is_resolved);
    assert!(!b.is_circular);
    let back = &b.children[0];
    assert_eq!(back.key(), "A@1.0");
    assert!(back.is_circular);
    assert!(back.children.is_empty());
    assert_eq!(back.depth, 2);

    let cycles = builder.detect_circular_dependencies("A", "1.0").await.unwrap();
    assert_eq!(cycles, vec!["A@1.0 -> B@2.0 -> A@1.0"]);
}

#[tokio::test]
async fn test_acyclic_package_has_no_cycles() {
    let builder = builder(vec![
        published("app", "1.0", 1, vec![req("a", "*"), req("b", "*")]),
        published("a", "1.0", 1, vec![req("c", "*")]),
        published("b", "1.0", 1, vec![req("c", "*")]),
        published("c", "1.0", 1, vec![]),
    ]);
    assert!(builder
        .detect_circular_dependencies("app", "1.0")
        .await
        .unwrap()
        .is_empty());

    let tree = builder.build_tree("app", "1.0", 10).await.unwrap();
    assert_eq!(tree.total_dependencies, 3);
    // Shared dependencies appear under every parent in the tree.
    let keys: Vec<String> = tree.root_node.iter().map(|n| n.key()).collect();
    assert_eq!(keys, vec!["app@1.0", "a@1.0", "c@1.0", "b@1.0", "c@1.0"]);
}

#[tokio::test]
async fn test_graph_matches_tree() {
    let builder = builder(vec![
        published("app", "1.0", 1, vec![req("a", "*"), req("b", "*")]),
        published("a", "1.0", 1, vec![req("c", "1.*")]),
        published("b", "1.0", 1, vec![req("c", ">=1.0")]),
        published("c", "1.0", 1, vec![]),
    ]);
    let tree = builder.build_tree("app", "1.0", 10).await.unwrap();
    let graph = build_graph(&tree);

    let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["app@1.0", "a@1.0", "c@1.0", "b@1.0"]);
    assert_eq!(graph.total_nodes, 4);
    assert_eq!(graph.total_edges, 4);
    assert!(graph.nodes[0].is_root);
    assert!(graph.nodes[1..].iter().all(|n| !n.is_root));
    assert_eq!(graph.nodes[2].level, 2);

    let into_c: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .filter(|e| e.to == "c@1.0")
        .map(|e| (e.from.as_str(), e.version_range.as_str()))
        .collect();
    assert_eq!(into_c, vec![("a@1.0", "1.*"), ("b@1.0", ">=1.0")]);

    let direct = builder
        .build_dependency_graph("app", "1.0", 10)
        .await
        .unwrap();
    assert_eq!(direct.total_nodes, graph.total_nodes);
    assert_eq!(direct.edges, graph.edges);
}

#[tokio::test]
async fn test_cyclic_graph_points_back_at_root() {
    let builder = builder(cyclic());
    let graph = builder.build_dependency_graph("A", "1.0", 5).await.unwrap();
    assert_eq!(graph.total_nodes, 2);
    assert_eq!(graph.total_edges, 2);
    assert!(graph.has_circular_dependencies);
    assert_eq!(graph.edges[1].from, "B@2.0");
    assert_eq!(graph.edges[1].to, "A@1.0");
}

#[tokio::test]
async fn test_most_recently_published_version_is_chosen() {
    let builder = builder(vec![
        published("app", "1.0", 1, vec![req("lib", "*")]),
        published("lib", "2.0.0", 2, vec![]),
        published("lib", "1.0.0", 9, vec![]),
    ]);
    let tree = builder.build_tree("app", "1.0", 3).await.unwrap();
    assert_eq!(tree.root_node.children[0].version, "1.0.0");
}

#[tokio::test]
async fn test_missing_dependency_is_unresolved() {
    let builder = builder(vec![
        published("app", "1.0", 1, vec![req("ghost", ">=3.0"), req("lib", "*")]),
        published("lib", "0.1.0", 1, vec![]),
    ]);
    let tree = builder.build_tree("app", "1.0", 3).await.unwrap();

    let ghost = &tree.root_node.children[0];
    assert!(!ghost.is_resolved);
    assert!(!ghost.is_circular);
    assert_eq!(ghost.version, ">=3.0");
    assert_eq!(tree.total_dependencies, 1);
    assert_eq!(
        render_tree(&tree.root_node),
        "app@1.0\n├── ghost@>=3.0 (unresolved)\n└── lib@0.1.0\n"
    );
}

#[tokio::test]
async fn test_missing_root_is_not_found() {
    let builder = builder(cyclic());
    let err = builder.build_tree("nope", "1.0", 5).await.unwrap_err();
    assert!(matches!(err, ResolveError::NotFound { ref package_id, .. } if package_id == "nope"));

    // Published under another ecosystem only.
    let err = builder
        .with_language(Language::Python)
        .build_tree("A", "1.0", 5)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("python"));
}

#[tokio::test]
async fn test_language_scopes_lookups() {
    let catalog: MemoryCatalog = vec![
        CatalogEntry::new(
            PackageMetadata::new("app", "1.0").with_dependency(req("lib", "*")),
            common::day(1),
            Language::Rust,
        ),
        CatalogEntry::new(PackageMetadata::new("lib", "1.0.0"), common::day(1), Language::Rust),
        CatalogEntry::new(
            PackageMetadata::new("lib", "9.0.0"),
            common::day(5),
            Language::Javascript,
        ),
    ]
    .into_iter()
    .collect();
    let builder = DependencyGraphBuilder::new(Arc::new(catalog)).with_language(Language::Rust);
    let tree = builder.build_tree("app", "1.0", 2).await.unwrap();
    assert_eq!(tree.root_node.children[0].version, "1.0.0");
}

#[tokio::test]
async fn test_find_path_through_built_graph() {
    let builder = builder(vec![
        published("app", "1.0", 1, vec![req("a", "*"), req("b", "*")]),
        published("a", "1.0", 1, vec![]),
        published("b", "1.0", 1, vec![req("c", "*")]),
        published("c", "1.0", 1, vec![]),
    ]);
    let tree = builder.build_tree("app", "1.0", 10).await.unwrap();
    let graph = DependencyGraph::from_tree(&tree.root_node);
    let path: Vec<String> = graph
        .find_path("c")
        .unwrap()
        .iter()
        .map(|n| n.id.clone())
        .collect();
    assert_eq!(path, vec!["app@1.0", "b@1.0", "c@1.0"]);
}

#[tokio::test]
async fn test_responses_serialize_camel_case() {
    let builder = builder(cyclic());
    let tree = builder.build_tree("A", "1.0", 10).await.unwrap();
    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json["packageId"], "A");
    assert_eq!(json["totalDependencies"], 1);
    assert_eq!(json["maxDepth"], 10);
    assert_eq!(json["hasCircularDependencies"], true);
    assert_eq!(json["circularPaths"][0], "A@1.0 -> B@2.0 -> A@1.0");
    let child = &json["rootNode"]["children"][0];
    assert_eq!(child["versionRange"], "2.0");
    assert_eq!(child["isResolved"], true);
    assert_eq!(child["children"][0]["isCircular"], true);

    let graph = serde_json::to_value(build_graph(&tree)).unwrap();
    assert_eq!(graph["totalNodes"], 2);
    assert_eq!(graph["totalEdges"], 2);
    assert_eq!(graph["nodes"][0]["isRoot"], true);
    assert_eq!(graph["edges"][0]["versionRange"], "2.0");
}

#[tokio::test]
async fn test_default_depth_comes_from_config() {
    let config = depot_core::config::DepotConfig::parse_toml("[resolver]\ndefault-max-depth = 1\n")
        .unwrap();
    let catalog: MemoryCatalog = cyclic().into_iter().collect();
    let builder = DependencyGraphBuilder::with_config(Arc::new(catalog), &config.resolver);

    let tree = builder.build_default_tree("A", "1.0").await.unwrap();
    assert_eq!(tree.max_depth, 1);
    assert!(!tree.root_node.children[0].is_resolved);

    let tree = builder
        .with_default_depth(60)
        .build_default_tree("A", "1.0")
        .await;
    assert!(matches!(tree, Err(ResolveError::DepthExceeded { max_depth: 60 })));
}
