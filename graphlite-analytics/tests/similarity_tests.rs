//! Node similarity and KNN tests

#[path = "testutils/mod.rs"]
mod testutils;

use graphlite_analytics::algo::{knn, node_similarity, KnnConfig, NodeSimilarityConfig};
use graphlite_analytics::{
    NodeFilter, NodeRecord, Projection, ProjectionConfig, PropertySpec, RelationshipRecord,
    RelationshipSpec,
};
use testutils::graph_fixture::RandomGraph;
use testutils::init_logger;

fn purchases() -> Projection {
    let mut nodes = vec![
        NodeRecord::with_labels("ann", &["Customer"]),
        NodeRecord::with_labels("ben", &["Customer"]),
        NodeRecord::with_labels("cat", &["Customer"]),
        NodeRecord::with_labels("shop", &["Store"]),
    ];
    nodes.extend(["p1", "p2", "p3", "p4"].iter().map(|id| NodeRecord::with_labels(*id, &["Product"])));
    let rels = vec![
        RelationshipRecord::new("ann", "p1", "BOUGHT"),
        RelationshipRecord::new("ann", "p2", "BOUGHT"),
        RelationshipRecord::new("ben", "p1", "BOUGHT"),
        RelationshipRecord::new("ben", "p2", "BOUGHT"),
        RelationshipRecord::new("cat", "p3", "BOUGHT"),
        RelationshipRecord::new("shop", "p1", "BOUGHT"),
        RelationshipRecord::new("shop", "p2", "BOUGHT"),
    ];
    let config = ProjectionConfig::new().with_relationship("BOUGHT", RelationshipSpec::default());
    Projection::build(nodes, rels, &config).unwrap()
}

#[test]
fn test_identical_neighbors_score_one_and_disjoint_are_excluded() {
    init_logger();
    let projection = purchases();
    let ann = projection.to_internal("ann").unwrap();
    let ben = projection.to_internal("ben").unwrap();
    let cat = projection.to_internal("cat").unwrap();

    let pairs = node_similarity(&projection, &NodeSimilarityConfig::default()).unwrap();
    let ann_ben = pairs
        .iter()
        .find(|p| p.node1 == ann && p.node2 == ben)
        .expect("ann and ben share products");
    assert_eq!(ann_ben.score, 1.0);
    assert!(pairs.iter().all(|p| p.node1 != cat && p.node2 != cat));

    // ordered by node1, then rank
    for window in pairs.windows(2) {
        assert!(window[0].node1 < window[1].node1
            || (window[0].node1 == window[1].node1 && window[0].score >= window[1].score));
    }
}

#[test]
fn test_label_filter_limits_compared_nodes() {
    let projection = purchases();
    let shop = projection.to_internal("shop").unwrap();

    let everyone = node_similarity(&projection, &NodeSimilarityConfig::default()).unwrap();
    assert!(everyone.iter().any(|p| p.node1 == shop));

    let config = NodeSimilarityConfig::default().with_label_filter(NodeFilter::labels(&["Customer"]));
    let customers = node_similarity(&projection, &config).unwrap();
    assert!(!customers.is_empty());
    assert!(customers.iter().all(|p| p.node1 != shop && p.node2 != shop));
    let (first, second) = customers[0].external_ids(&projection).unwrap();
    assert_eq!((first, second), ("ann", "ben"));
}

#[test]
fn test_node_similarity_is_deterministic() {
    let projection = RandomGraph::generate(11, 120, 600, 1).projection();
    let config = NodeSimilarityConfig::default().with_top_k(3);
    let first = node_similarity(&projection, &config).unwrap();
    let second = node_similarity(&projection, &config).unwrap();
    assert_eq!(first, second);
    assert!(first.iter().all(|p| p.score > 0.0 && p.score <= 1.0));
}

#[test]
fn test_knn_from_json_config() {
    let nodes = vec![
        NodeRecord::new("x").property("embedding", vec![1.0, 1.0, 0.0]),
        NodeRecord::new("y").property("embedding", vec![1.0, 0.9, 0.1]),
        NodeRecord::new("z").property("embedding", vec![0.0, 0.1, 1.0]),
        NodeRecord::new("w"),
    ];
    let config = ProjectionConfig::new().with_node_property(
        PropertySpec::new("embedding").with_default(vec![0.0, 0.0, 0.0]),
    );
    let projection = Projection::build(nodes, Vec::<RelationshipRecord>::new(), &config).unwrap();

    let knn_config: KnnConfig = serde_json::from_str(
        r#"{ "node_property": "embedding", "metric": "COSINE", "top_k": 1, "similarity_cutoff": 0.5 }"#,
    )
    .unwrap();
    let pairs = knn(&projection, &knn_config).unwrap();
    let named: Vec<(&str, &str)> = pairs
        .iter()
        .map(|p| p.external_ids(&projection).unwrap())
        .collect();
    // w holds the zero-vector default, which is similar to nothing
    assert_eq!(named, vec![("x", "y"), ("y", "x")]);
}
