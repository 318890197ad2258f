// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Projection transformations
//!
//! Transformations never touch their input; they return a new projection.

use crate::error::{GraphError, Result};
use crate::projection::config::{Orientation, RelationshipSpec};
use crate::projection::graph::{Adjacency, Projection};
use log::debug;
use std::collections::BTreeSet;

/// Add a relationship of `new_type` from every node to each distinct node
/// reachable by following exactly the types in `path_types`, in order.
///
/// Existing relationships and all properties are carried over; the new
/// relationships resolve relationship properties to their defaults.
pub fn collapse_path(
    projection: &Projection,
    path_types: &[&str],
    new_type: &str,
    allow_self_loops: bool,
) -> Result<Projection> {
    if path_types.is_empty() {
        return Err(GraphError::config("collapse path needs at least one relationship type"));
    }
    if projection.type_id(new_type).is_some() {
        return Err(GraphError::schema(format!(
            "relationship type '{}' already exists in the projection",
            new_type
        )));
    }
    let steps = path_types
        .iter()
        .map(|t| {
            projection.type_id(t).ok_or_else(|| {
                GraphError::schema(format!("relationship type '{}' is not projected", t))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let new_type_id = projection.relationship_types.len();
    let mut entries: Vec<(usize, usize, usize)> = projection
        .relationships()
        .map(|r| (r.source, r.target, r.type_id))
        .collect();
    let existing = entries.len();

    for start in 0..projection.node_count() {
        let mut frontier = BTreeSet::from([start]);
        for &step in &steps {
            frontier = frontier
                .iter()
                .flat_map(|&node| projection.outgoing(node))
                .filter(|r| r.type_id == step)
                .map(|r| r.target)
                .collect();
            if frontier.is_empty() {
                break;
            }
        }
        for end in frontier {
            if end != start || allow_self_loops {
                entries.push((start, end, new_type_id));
            }
        }
    }

    debug!(
        "Collapsed path {:?} into {} '{}' relationships",
        path_types,
        entries.len() - existing,
        new_type
    );

    let (outgoing, order) = Adjacency::from_entries(projection.node_count(), &entries);
    let mapping: Vec<Option<usize>> = order
        .iter()
        .map(|&position| (position < existing).then_some(position))
        .collect();
    let properties = projection.properties.remap_relationships(&mapping)?;
    let incoming = projection
        .incoming
        .is_some()
        .then(|| Adjacency::inverse_of(&outgoing));

    let mut config = projection.config.clone();
    config
        .relationship_specs
        .insert(new_type.to_string(), RelationshipSpec::new(Orientation::Natural));

    let mut relationship_types = projection.relationship_types.clone();
    relationship_types.push(new_type.to_string());
    let mut type_orientations = projection.type_orientations.clone();
    type_orientations.push(Orientation::Natural);

    Ok(Projection {
        config,
        external_ids: projection.external_ids.clone(),
        id_map: projection.id_map.clone(),
        node_labels: projection.node_labels.clone(),
        relationship_types,
        type_orientations,
        outgoing,
        incoming,
        properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::config::{ProjectionConfig, PropertySpec};
    use crate::storage::types::{NodeRecord, RelationshipRecord};
    use crate::storage::value::PropertyValue;

    fn chain() -> Projection {
        let nodes: Vec<_> = ["a", "b", "c", "d"].iter().map(|id| NodeRecord::new(*id)).collect();
        let rels = vec![
            RelationshipRecord::new("a", "b", "R").property("w", 2.0),
            RelationshipRecord::new("b", "c", "S").property("w", 3.0),
            RelationshipRecord::new("b", "d", "S").property("w", 4.0),
        ];
        let spec = RelationshipSpec::default().with_property(PropertySpec::new("w").with_default(1.0));
        let config = ProjectionConfig::new()
            .with_relationship("R", spec.clone())
            .with_relationship("S", spec);
        Projection::build(nodes, rels, &config).unwrap()
    }

    #[test]
    fn test_collapse_two_hops() {
        let projection = chain();
        let collapsed = collapse_path(&projection, &["R", "S"], "RS", false).unwrap();

        let rs = collapsed.type_id("RS").unwrap();
        let added: Vec<_> = collapsed
            .relationships()
            .filter(|r| r.type_id == rs)
            .map(|r| (r.source, r.target))
            .collect();
        assert_eq!(added, vec![(0, 2), (0, 3)]);
        assert_eq!(collapsed.relationship_count(), 5);

        // original untouched
        assert_eq!(projection.relationship_count(), 3);
        assert!(projection.type_id("RS").is_none());
    }

    #[test]
    fn test_properties_follow_relationships() {
        let collapsed = collapse_path(&chain(), &["R", "S"], "RS", false).unwrap();
        let rs = collapsed.type_id("RS").unwrap();
        for rel in collapsed.relationships() {
            let w = collapsed.relationship_property(rel.index, "w").unwrap();
            let expected = match (rel.source, rel.target) {
                _ if rel.type_id == rs => 1.0,
                (0, 1) => 2.0,
                (1, 2) => 3.0,
                (1, 3) => 4.0,
                other => panic!("unexpected relationship {:?}", other),
            };
            assert_eq!(w, Some(PropertyValue::Double(expected)));
        }
    }

    #[test]
    fn test_unknown_and_existing_types() {
        let projection = chain();
        assert!(matches!(
            collapse_path(&projection, &["X"], "Y", false),
            Err(GraphError::Schema(_))
        ));
        assert!(matches!(
            collapse_path(&projection, &["R"], "S", false),
            Err(GraphError::Schema(_))
        ));
    }
}
