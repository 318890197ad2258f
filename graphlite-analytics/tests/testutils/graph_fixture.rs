//! Graph fixtures shared by the integration tests

use graphlite_analytics::{
    NodeRecord, Orientation, Projection, ProjectionConfig, PropertySpec, RelationshipRecord,
    RelationshipSpec,
};

/// Relationship type used by weighted fixtures
pub const ROAD: &str = "ROAD";

/// Weight property used by weighted fixtures
pub const COST: &str = "cost";

/// Records for `edges`, with nodes created in order of first appearance plus `extra_nodes`
pub fn weighted_records(
    edges: &[(&str, &str, f64)],
    extra_nodes: &[&str],
) -> (Vec<NodeRecord>, Vec<RelationshipRecord>) {
    let mut ids: Vec<&str> = Vec::new();
    for id in edges.iter().flat_map(|(a, b, _)| [*a, *b]).chain(extra_nodes.iter().copied()) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    let nodes = ids.into_iter().map(NodeRecord::new).collect();
    let rels = edges
        .iter()
        .map(|(a, b, w)| RelationshipRecord::new(*a, *b, ROAD).property(COST, *w))
        .collect();
    (nodes, rels)
}

/// Projection config for weighted `ROAD` relationships
pub fn road_config(orientation: Orientation) -> ProjectionConfig {
    ProjectionConfig::new().with_relationship(
        ROAD,
        RelationshipSpec::new(orientation).with_property(PropertySpec::new(COST).with_default(1.0)),
    )
}

pub fn weighted_graph(edges: &[(&str, &str, f64)], extra_nodes: &[&str]) -> Projection {
    let (nodes, rels) = weighted_records(edges, extra_nodes);
    Projection::build(nodes, rels, &road_config(Orientation::Natural))
        .expect("Failed to build weighted graph")
}

/// A-B (1), B-C (1), A-C (5), plus isolated D
pub fn triangle_with_isolated() -> Projection {
    weighted_graph(&[("A", "B", 1.0), ("B", "C", 1.0), ("A", "C", 5.0)], &["D"])
}

/// Center `hub` pointing at `leaves` leaf nodes
pub fn star(leaves: usize) -> Projection {
    let edges: Vec<(String, String)> = (0..leaves)
        .map(|i| ("hub".to_string(), format!("leaf{}", i)))
        .collect();
    let edges: Vec<(&str, &str, f64)> = edges.iter().map(|(a, b)| (a.as_str(), b.as_str(), 1.0)).collect();
    weighted_graph(&edges, &[])
}

/// Random directed graph with integer weights in 1..=max_weight
pub struct RandomGraph {
    pub node_count: usize,
    pub edges: Vec<(usize, usize, u32)>,
}

impl RandomGraph {
    pub fn generate(seed: u64, node_count: usize, edge_count: usize, max_weight: u32) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let edges = (0..edge_count)
            .map(|_| {
                (
                    rng.usize(..node_count),
                    rng.usize(..node_count),
                    rng.u32(1..=max_weight),
                )
            })
            .collect();
        Self { node_count, edges }
    }

    pub fn node_id(index: usize) -> String {
        format!("n{}", index)
    }

    pub fn projection(&self) -> Projection {
        let nodes: Vec<NodeRecord> = (0..self.node_count)
            .map(|i| NodeRecord::new(Self::node_id(i)))
            .collect();
        let rels: Vec<RelationshipRecord> = self
            .edges
            .iter()
            .map(|&(a, b, w)| {
                RelationshipRecord::new(Self::node_id(a), Self::node_id(b), ROAD)
                    .property(COST, w as f64)
            })
            .collect();
        Projection::build(nodes, rels, &road_config(Orientation::Natural))
            .expect("Failed to build random graph")
    }
}
