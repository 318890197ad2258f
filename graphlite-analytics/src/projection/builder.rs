// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Projection builder
//!
//! Turns node and relationship records into a [`Projection`]:
//! 1. filter nodes and assign dense indices in input order
//! 2. resolve relationship endpoints (unknown endpoints are an error)
//! 3. apply each type's orientation
//! 4. merge parallel relationships for types that declare an aggregation
//! 5. load node and relationship properties, applying defaults
//!
//! A build either returns a complete projection or an error; nothing partial
//! escapes.

use crate::error::{GraphError, Result};
use crate::projection::config::{Aggregation, Orientation, ProjectionConfig, PropertySpec, WILDCARD};
use crate::projection::graph::{Adjacency, Projection};
use crate::storage::property_store::{EntityKind, PropertyColumn, PropertySchema, PropertyStore};
use crate::storage::types::{NodeRecord, RelationshipRecord};
use crate::storage::value::{PropertyValue, Value, ValueType};
use log::{debug, info};
use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Tracks the shape and default of one property while records are read
struct ColumnBuilder {
    name: String,
    default: Option<PropertyValue>,
    value_type: Option<ValueType>,
}

impl ColumnBuilder {
    fn new(spec: &PropertySpec) -> Result<Self> {
        let mut builder = Self {
            name: spec.name.clone(),
            default: None,
            value_type: spec.value_type,
        };
        if let Some(default) = &spec.default {
            builder.check(default)?;
            builder.default = Some(default.clone());
        }
        Ok(builder)
    }

    fn check(&mut self, value: &PropertyValue) -> Result<()> {
        let actual = value.value_type();
        match self.value_type {
            Some(expected) if expected != actual => Err(GraphError::TypeMismatch {
                property: self.name.clone(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.value_type = Some(actual);
                Ok(())
            }
        }
    }

    /// Record value converted and shape-checked, or the default
    fn resolve(
        &mut self,
        raw: Option<&Value>,
        entity: impl Fn() -> String,
    ) -> Result<Option<PropertyValue>> {
        let value = match raw {
            Some(raw) => raw.to_property_value(&self.name)?,
            None => None,
        };
        match value {
            Some(value) => {
                self.check(&value)?;
                Ok(Some(value))
            }
            None if self.default.is_some() => Ok(self.default.clone()),
            None => Err(GraphError::schema(format!(
                "{} has no value for property '{}' and no default is declared",
                entity(),
                self.name
            ))),
        }
    }

    fn finish(self, values: Vec<Option<PropertyValue>>) -> Result<PropertyColumn> {
        let value_type = self.value_type.unwrap_or(ValueType::Double);
        let schema = PropertySchema::new(&self.name, value_type, self.default)?;
        PropertyColumn::from_values(self.name, schema, values)
    }
}

/// Relationship after orientation, before aggregation
struct PendingRelationship {
    source: usize,
    target: usize,
    type_id: usize,
    /// One slot per relationship property column
    values: Vec<Option<PropertyValue>>,
    merged: usize,
}

/// Per relationship type: how it was projected
struct TypeInfo {
    name: String,
    orientation: Orientation,
    aggregation: Option<Aggregation>,
    slots: Vec<usize>,
}

/// Build a projection from node and relationship records
pub fn build<N, R>(nodes: N, relationships: R, config: &ProjectionConfig) -> Result<Projection>
where
    N: IntoIterator,
    N::Item: Borrow<NodeRecord>,
    R: IntoIterator,
    R::Item: Borrow<RelationshipRecord>,
{
    config.validate()?;

    // Nodes
    let mut external_ids: Vec<String> = Vec::new();
    let mut id_map: HashMap<String, usize> = HashMap::new();
    let mut node_labels: Vec<Vec<String>> = Vec::new();
    let mut node_columns = config
        .node_properties
        .iter()
        .map(ColumnBuilder::new)
        .collect::<Result<Vec<_>>>()?;
    let mut node_values: Vec<Vec<Option<PropertyValue>>> = vec![Vec::new(); node_columns.len()];
    let mut filtered_out = 0usize;
    let mut duplicates = 0usize;

    for record in nodes {
        let node = record.borrow();
        if !config.node_filter.matches(&node.labels) {
            filtered_out += 1;
            continue;
        }

        if let Some(&index) = id_map.get(&node.external_id) {
            let labels = &mut node_labels[index];
            labels.extend(config.node_filter.retained(&node.labels));
            labels.sort();
            labels.dedup();
            duplicates += 1;
            continue;
        }

        for ((column, values), spec) in node_columns
            .iter_mut()
            .zip(node_values.iter_mut())
            .zip(&config.node_properties)
        {
            let value = column.resolve(node.get_property(spec.source_key()), || {
                format!("node '{}'", node.external_id)
            })?;
            values.push(value);
        }

        id_map.insert(node.external_id.clone(), external_ids.len());
        external_ids.push(node.external_id.clone());
        node_labels.push(config.node_filter.retained(&node.labels));
    }

    debug!(
        "Projected {} nodes ({} filtered out, {} duplicate ids merged)",
        external_ids.len(),
        filtered_out,
        duplicates
    );

    // Relationship property columns are shared by name across types
    let mut rel_columns: Vec<ColumnBuilder> = Vec::new();
    let mut slots_by_spec: HashMap<&str, Vec<usize>> = HashMap::new();
    for (rel_type, spec) in &config.relationship_specs {
        let mut slots = Vec::with_capacity(spec.properties.len());
        for property in &spec.properties {
            let slot = match rel_columns.iter().position(|c| c.name == property.name) {
                Some(slot) => slot,
                None => {
                    rel_columns.push(ColumnBuilder::new(property)?);
                    rel_columns.len() - 1
                }
            };
            slots.push(slot);
        }
        slots_by_spec.insert(rel_type.as_str(), slots);
    }

    let mut types: Vec<TypeInfo> = Vec::new();
    let mut type_ids: HashMap<String, usize> = HashMap::new();
    for (rel_type, spec) in &config.relationship_specs {
        if rel_type != WILDCARD {
            type_ids.insert(rel_type.clone(), types.len());
            types.push(TypeInfo {
                name: rel_type.clone(),
                orientation: spec.orientation,
                aggregation: spec.aggregation,
                slots: slots_by_spec[rel_type.as_str()].clone(),
            });
        }
    }

    let mut pending: Vec<PendingRelationship> = Vec::new();
    let mut skipped = 0usize;

    for record in relationships {
        let rel = record.borrow();
        let (spec_key, spec) = match config.relationship_specs.get_key_value(&rel.rel_type) {
            Some((key, spec)) => (key.as_str(), spec),
            None => match config.relationship_specs.get_key_value(WILDCARD) {
                Some((key, spec)) => (key.as_str(), spec),
                None => {
                    skipped += 1;
                    continue;
                }
            },
        };

        let (source, target) = match (id_map.get(&rel.source), id_map.get(&rel.target)) {
            (Some(&source), Some(&target)) => (source, target),
            _ => {
                return Err(GraphError::DanglingReference {
                    source_id: rel.source.clone(),
                    target_id: rel.target.clone(),
                    rel_type: rel.rel_type.clone(),
                })
            }
        };

        let source_ok = spec
            .source_label
            .as_deref()
            .map_or(true, |label| node_labels[source].iter().any(|l| l == label));
        let target_ok = spec
            .target_label
            .as_deref()
            .map_or(true, |label| node_labels[target].iter().any(|l| l == label));
        if !source_ok || !target_ok {
            skipped += 1;
            continue;
        }

        let type_id = match type_ids.get(&rel.rel_type) {
            Some(&type_id) => type_id,
            None => {
                type_ids.insert(rel.rel_type.clone(), types.len());
                types.push(TypeInfo {
                    name: rel.rel_type.clone(),
                    orientation: spec.orientation,
                    aggregation: spec.aggregation,
                    slots: slots_by_spec[spec_key].clone(),
                });
                types.len() - 1
            }
        };

        let mut values = vec![None; rel_columns.len()];
        if spec.aggregation != Some(Aggregation::Count) {
            for (property, &slot) in spec.properties.iter().zip(&types[type_id].slots) {
                values[slot] = rel_columns[slot].resolve(rel.get_property(property.source_key()), || {
                    format!(
                        "relationship ({})-[:{}]->({})",
                        rel.source, rel.rel_type, rel.target
                    )
                })?;
            }
        }

        let mut emit = |source: usize, target: usize, values: Vec<Option<PropertyValue>>| {
            pending.push(PendingRelationship {
                source,
                target,
                type_id,
                values,
                merged: 1,
            })
        };
        match spec.orientation {
            Orientation::Natural => emit(source, target, values),
            Orientation::Reverse => emit(target, source, values),
            Orientation::Undirected => {
                emit(source, target, values.clone());
                emit(target, source, values);
            }
        }
    }

    let oriented = pending.len();
    let merged = aggregate(pending, &types, &rel_columns)?;
    debug!(
        "Projected {} relationships ({} oriented, {} skipped by type or label)",
        merged.len(),
        oriented,
        skipped
    );

    // Topology
    let node_count = external_ids.len();
    let entries: Vec<(usize, usize, usize)> = merged
        .iter()
        .map(|r| (r.source, r.target, r.type_id))
        .collect();
    let (outgoing, order) = Adjacency::from_entries(node_count, &entries);
    let incoming = config
        .index_inverse()
        .then(|| Adjacency::inverse_of(&outgoing));

    // Properties
    let properties = PropertyStore::new(node_count, merged.len());
    for (column, values) in node_columns.into_iter().zip(node_values) {
        properties.insert_column(EntityKind::Node, column.finish(values)?)?;
    }
    for (slot, column) in rel_columns.into_iter().enumerate() {
        let values = order
            .iter()
            .map(|&position| merged[position].values[slot].clone())
            .collect();
        properties.insert_column(EntityKind::Relationship, column.finish(values)?)?;
    }

    info!(
        "Built projection with {} nodes, {} relationships, {} relationship types",
        node_count,
        merged.len(),
        types.len()
    );

    Ok(Projection {
        config: config.clone(),
        external_ids,
        id_map,
        node_labels,
        relationship_types: types.iter().map(|t| t.name.clone()).collect(),
        type_orientations: types.iter().map(|t| t.orientation).collect(),
        outgoing,
        incoming,
        properties,
    })
}

/// Merge parallel relationships of aggregated types, keeping first-occurrence order
fn aggregate(
    pending: Vec<PendingRelationship>,
    types: &[TypeInfo],
    columns: &[ColumnBuilder],
) -> Result<Vec<PendingRelationship>> {
    let mut merged: Vec<PendingRelationship> = Vec::with_capacity(pending.len());
    let mut positions: HashMap<(usize, usize, usize), usize> = HashMap::new();

    for rel in pending {
        let info = &types[rel.type_id];
        let Some(aggregation) = info.aggregation else {
            merged.push(rel);
            continue;
        };

        match positions.entry((rel.source, rel.target, rel.type_id)) {
            Entry::Vacant(entry) => {
                entry.insert(merged.len());
                merged.push(rel);
            }
            Entry::Occupied(entry) => {
                let existing = &mut merged[*entry.get()];
                existing.merged += 1;
                let mut incoming = rel.values;
                for &slot in &info.slots {
                    let current = existing.values[slot].take();
                    existing.values[slot] = combine(
                        aggregation,
                        &columns[slot].name,
                        current,
                        incoming[slot].take(),
                    )?;
                }
            }
        }
    }

    for rel in merged.iter_mut() {
        let info = &types[rel.type_id];
        if info.aggregation == Some(Aggregation::Count) {
            for &slot in &info.slots {
                rel.values[slot] = Some(PropertyValue::Double(rel.merged as f64));
            }
        }
    }

    Ok(merged)
}

fn combine(
    aggregation: Aggregation,
    property: &str,
    current: Option<PropertyValue>,
    next: Option<PropertyValue>,
) -> Result<Option<PropertyValue>> {
    if matches!(aggregation, Aggregation::Single | Aggregation::Count) {
        return Ok(current.or(next));
    }

    let (a, b) = match (current, next) {
        (Some(a), Some(b)) => (a, b),
        (Some(v), None) | (None, Some(v)) => return Ok(Some(v)),
        (None, None) => return Ok(None),
    };
    match (a.as_double(), b.as_double()) {
        (Some(x), Some(y)) => {
            let value = match aggregation {
                Aggregation::Sum => x + y,
                Aggregation::Min => x.min(y),
                Aggregation::Max => x.max(y),
                Aggregation::Count | Aggregation::Single => x,
            };
            Ok(Some(PropertyValue::Double(value)))
        }
        _ => Err(GraphError::TypeMismatch {
            property: property.to_string(),
            expected: ValueType::Double.to_string(),
            actual: a.value_type().to_string(),
        }),
    }
}

impl Projection {
    /// Build a projection; see [`build`]
    pub fn build<N, R>(nodes: N, relationships: R, config: &ProjectionConfig) -> Result<Self>
    where
        N: IntoIterator,
        N::Item: Borrow<NodeRecord>,
        R: IntoIterator,
        R::Item: Borrow<RelationshipRecord>,
    {
        build(nodes, relationships, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::config::RelationshipSpec;

    fn people() -> Vec<NodeRecord> {
        vec![
            NodeRecord::with_labels("alice", &["Person"]).property("age", 30_i64),
            NodeRecord::with_labels("bob", &["Person"]).property("age", 40_i64),
            NodeRecord::with_labels("acme", &["Company"]),
        ]
    }

    #[test]
    fn test_indices_follow_input_order() {
        let config = ProjectionConfig::new();
        let projection = build(people(), Vec::<RelationshipRecord>::new(), &config).unwrap();

        assert_eq!(projection.node_count(), 3);
        assert_eq!(projection.to_internal("alice").unwrap(), 0);
        assert_eq!(projection.to_internal("acme").unwrap(), 2);
        assert_eq!(projection.to_external(1), Some("bob"));
    }

    #[test]
    fn test_duplicate_ids_merge_labels() {
        let nodes = vec![
            NodeRecord::with_labels("n", &["A"]),
            NodeRecord::with_labels("n", &["B"]),
        ];
        let projection =
            build(nodes, Vec::<RelationshipRecord>::new(), &ProjectionConfig::new()).unwrap();
        assert_eq!(projection.node_count(), 1);
        assert_eq!(projection.labels(0).unwrap(), &["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_missing_node_property_without_default() {
        let config = ProjectionConfig::new().with_node_property(PropertySpec::new("age"));
        let err = build(people(), Vec::<RelationshipRecord>::new(), &config).unwrap_err();
        assert!(matches!(err, GraphError::Schema(_)));
    }

    #[test]
    fn test_node_property_default_applied() {
        let config =
            ProjectionConfig::new().with_node_property(PropertySpec::new("age").with_default(0.0));
        let projection = build(people(), Vec::<RelationshipRecord>::new(), &config).unwrap();
        assert_eq!(
            projection.node_property(1, "age").unwrap(),
            Some(PropertyValue::Double(40.0))
        );
        assert_eq!(
            projection.node_property(2, "age").unwrap(),
            Some(PropertyValue::Double(0.0))
        );
    }

    #[test]
    fn test_aggregation_count_and_sum() {
        let rels = vec![
            RelationshipRecord::new("alice", "bob", "PAID").property("amount", 10.0),
            RelationshipRecord::new("alice", "bob", "PAID").property("amount", 5.0),
            RelationshipRecord::new("bob", "alice", "PAID").property("amount", 1.0),
        ];
        let config = ProjectionConfig::new()
            .with_relationship(
                "PAID",
                RelationshipSpec::new(Orientation::Natural)
                    .with_aggregation(Aggregation::Sum)
                    .with_property(PropertySpec::new("amount")),
            );
        let projection = build(people(), &rels, &config).unwrap();

        assert_eq!(projection.relationship_count(), 2);
        let first = projection.outgoing(0).next().unwrap();
        assert_eq!(first.target, 1);
        assert_eq!(
            projection.relationship_property(first.index, "amount").unwrap(),
            Some(PropertyValue::Double(15.0))
        );

        let counted = ProjectionConfig::new().with_relationship(
            "PAID",
            RelationshipSpec::new(Orientation::Natural)
                .with_aggregation(Aggregation::Count)
                .with_property(PropertySpec::new("times")),
        );
        let projection = build(people(), &rels, &counted).unwrap();
        let first = projection.outgoing(0).next().unwrap();
        assert_eq!(
            projection.relationship_property(first.index, "times").unwrap(),
            Some(PropertyValue::Double(2.0))
        );
    }

    #[test]
    fn test_unprojected_types_are_skipped() {
        let rels = vec![
            RelationshipRecord::new("alice", "bob", "KNOWS"),
            RelationshipRecord::new("alice", "acme", "WORKS_AT"),
        ];
        let config = ProjectionConfig::new().with_relationship("KNOWS", RelationshipSpec::default());
        let projection = build(people(), &rels, &config).unwrap();
        assert_eq!(projection.relationship_count(), 1);
        assert_eq!(projection.relationship_types(), &["KNOWS".to_string()]);
    }

    #[test]
    fn test_wildcard_keeps_type_names() {
        let rels = vec![
            RelationshipRecord::new("alice", "bob", "KNOWS"),
            RelationshipRecord::new("alice", "acme", "WORKS_AT"),
        ];
        let config = ProjectionConfig::new().with_relationship(WILDCARD, RelationshipSpec::default());
        let projection = build(people(), &rels, &config).unwrap();
        assert_eq!(
            projection.relationship_types(),
            &["KNOWS".to_string(), "WORKS_AT".to_string()]
        );
    }

    #[test]
    fn test_endpoint_label_restriction() {
        let rels = vec![
            RelationshipRecord::new("alice", "acme", "LINK"),
            RelationshipRecord::new("alice", "bob", "LINK"),
        ];
        let config = ProjectionConfig::new().with_relationship(
            "LINK",
            RelationshipSpec::default().with_endpoint_labels(None, Some("Company")),
        );
        let projection = build(people(), &rels, &config).unwrap();
        assert_eq!(projection.relationship_count(), 1);
        assert_eq!(projection.successors(0), &[2]);
    }

    #[test]
    fn test_reverse_orientation_and_inverse_index() {
        let rels = vec![RelationshipRecord::new("alice", "bob", "FOLLOWS")];
        let config = ProjectionConfig::new().with_relationship(
            "FOLLOWS",
            RelationshipSpec::new(Orientation::Reverse).with_inverse_index(),
        );
        let projection = build(people(), &rels, &config).unwrap();
        assert_eq!(projection.successors(1), &[0]);
        assert!(projection.successors(0).is_empty());

        let incoming: Vec<_> = projection.incoming(0).unwrap().map(|r| r.source).collect();
        assert_eq!(incoming, vec![1]);
    }

    #[test]
    fn test_relationship_value_shape_drift() {
        let rels = vec![
            RelationshipRecord::new("alice", "bob", "R").property("w", 1.0),
            RelationshipRecord::new("bob", "alice", "R").property("w", vec![1.0, 2.0]),
        ];
        let config = ProjectionConfig::new().with_relationship(
            "R",
            RelationshipSpec::default().with_property(PropertySpec::new("w")),
        );
        let err = build(people(), &rels, &config).unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { .. }));
    }
}
