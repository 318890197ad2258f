//! Projection catalog tests

#[path = "testutils/mod.rs"]
mod testutils;

use graphlite_analytics::algo::{degree, shortest_path};
use graphlite_analytics::{collapse_path, GraphError, Orientation, ProjectionCatalog};
use std::sync::Arc;
use testutils::graph_fixture::{road_config, weighted_records, COST, ROAD};
use testutils::init_logger;

#[test]
fn test_project_run_and_drop() {
    init_logger();
    let catalog = ProjectionCatalog::new();
    let (nodes, rels) = weighted_records(&[("A", "B", 1.0), ("B", "C", 2.0)], &[]);
    let graph = catalog
        .project("roads", &nodes, &rels, &road_config(Orientation::Natural))
        .unwrap();

    let path = shortest_path(&graph, 0, 2, Some(COST)).unwrap().unwrap();
    assert_eq!(path.total_cost, 3.0);

    match catalog.drop("roads") {
        Err(GraphError::ProjectionInUse { name, handles }) => {
            assert_eq!(name, "roads");
            assert_eq!(handles, 1);
        }
        other => panic!("expected ProjectionInUse, got {:?}", other),
    }

    drop(graph);
    let info = catalog.drop("roads").unwrap();
    assert_eq!(info.node_count, 3);
    assert_eq!(info.relationship_properties, vec![COST.to_string()]);
    assert!(!catalog.exists("roads"));
}

#[test]
fn test_register_transformed_projection() {
    let catalog = ProjectionCatalog::new();
    let (nodes, rels) = weighted_records(&[("A", "B", 1.0), ("B", "C", 1.0)], &[]);
    let base = catalog
        .project("base", &nodes, &rels, &road_config(Orientation::Natural))
        .unwrap();

    let two_hop = collapse_path(&base, &[ROAD, ROAD], "TWO_HOP", false).unwrap();
    catalog.register("two_hop", two_hop).unwrap();

    let names: Vec<String> = catalog.list().into_iter().map(|info| info.name).collect();
    assert_eq!(names, vec!["base".to_string(), "two_hop".to_string()]);

    let derived = catalog.get("two_hop").unwrap();
    assert_eq!(derived.relationship_count(), 3);
    assert!(matches!(
        catalog.register("base", (*derived).clone()),
        Err(GraphError::ProjectionExists(_))
    ));
}

#[test]
fn test_concurrent_readers_share_one_projection() {
    let catalog = ProjectionCatalog::new();
    let (nodes, rels) = weighted_records(&[("hub", "a", 1.0), ("hub", "b", 1.0), ("a", "b", 1.0)], &[]);
    catalog
        .project("g", &nodes, &rels, &road_config(Orientation::Natural))
        .unwrap();

    let results: Vec<Vec<f64>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let catalog = catalog.clone();
                scope.spawn(move || {
                    let graph: Arc<_> = catalog.get("g").unwrap();
                    degree(&graph, Orientation::Undirected, None).unwrap().scores().to_vec()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for scores in &results {
        assert_eq!(scores, &vec![2.0, 2.0, 2.0]);
    }
    assert!(catalog.drop("g").is_ok());
}
