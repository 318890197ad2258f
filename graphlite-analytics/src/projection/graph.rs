// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory projection
//!
//! Nodes are addressed by a dense internal index `0..node_count`. Relationships
//! live in compressed sparse rows grouped by source node; the position of a
//! relationship in the outgoing rows is its relationship index, which is also
//! the key for relationship properties. Topology never changes after build.

use crate::error::{GraphError, Result};
use crate::projection::config::{Orientation, ProjectionConfig};
use crate::storage::property_store::{EntityKind, PropertyColumn, PropertyStore};
use crate::storage::value::PropertyValue;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

/// A relationship as seen from one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship index (key for relationship properties)
    pub index: usize,
    pub source: usize,
    pub target: usize,
    pub type_id: usize,
}

/// Compressed sparse row adjacency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjacency {
    /// Offsets for each node. Size = node_count + 1.
    offsets: Vec<usize>,
    /// Other endpoint of each entry
    others: Vec<usize>,
    /// Relationship index of each entry
    relationships: Vec<usize>,
    /// Relationship type of each entry
    types: Vec<usize>,
}

impl Adjacency {
    /// Group `(from, to, type_id)` entries by `from`, keeping input order within a
    /// node. Returns the adjacency and, per row position, the position of the
    /// entry in `entries`.
    pub(crate) fn from_entries(
        node_count: usize,
        entries: &[(usize, usize, usize)],
    ) -> (Self, Vec<usize>) {
        let mut offsets = vec![0usize; node_count + 1];
        for &(from, _, _) in entries {
            offsets[from + 1] += 1;
        }
        for i in 0..node_count {
            offsets[i + 1] += offsets[i];
        }

        let mut cursor = offsets.clone();
        let mut order = vec![0usize; entries.len()];
        for (position, &(from, _, _)) in entries.iter().enumerate() {
            order[cursor[from]] = position;
            cursor[from] += 1;
        }

        let others = order.iter().map(|&p| entries[p].1).collect();
        let types = order.iter().map(|&p| entries[p].2).collect();
        let relationships = (0..entries.len()).collect();

        (
            Self {
                offsets,
                others,
                relationships,
                types,
            },
            order,
        )
    }

    /// Inverse of an outgoing adjacency: rows keyed by target, entries keep the
    /// outgoing relationship index
    pub(crate) fn inverse_of(outgoing: &Adjacency) -> Self {
        let node_count = outgoing.node_count();
        let mut offsets = vec![0usize; node_count + 1];
        for &target in &outgoing.others {
            offsets[target + 1] += 1;
        }
        for i in 0..node_count {
            offsets[i + 1] += offsets[i];
        }

        let mut cursor = offsets.clone();
        let entry_count = outgoing.others.len();
        let mut others = vec![0usize; entry_count];
        let mut relationships = vec![0usize; entry_count];
        let mut types = vec![0usize; entry_count];
        for source in 0..node_count {
            for position in outgoing.offsets[source]..outgoing.offsets[source + 1] {
                let target = outgoing.others[position];
                let slot = cursor[target];
                others[slot] = source;
                relationships[slot] = outgoing.relationships[position];
                types[slot] = outgoing.types[position];
                cursor[target] += 1;
            }
        }

        Self {
            offsets,
            others,
            relationships,
            types,
        }
    }

    pub fn node_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn entry_count(&self) -> usize {
        self.others.len()
    }

    /// Entry range of a node's row; empty for indices past the last row
    fn row(&self, node: usize) -> Range<usize> {
        match (self.offsets.get(node), self.offsets.get(node + 1)) {
            (Some(&start), Some(&end)) => start..end,
            _ => 0..0,
        }
    }

    pub fn degree(&self, node: usize) -> usize {
        self.row(node).len()
    }

    /// Other endpoints of a node's entries, in row order
    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.others[self.row(node)]
    }

    /// `(other, relationship index, type id)` for each entry of a node
    pub fn entries(&self, node: usize) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.row(node)
            .map(move |i| (self.others[i], self.relationships[i], self.types[i]))
    }
}

/// Graph statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStats {
    pub node_count: usize,
    pub relationship_count: usize,
    pub node_label_count: usize,
    pub relationship_type_count: usize,
}

/// Immutable in-memory graph view with a mutable property store
#[derive(Debug, Clone)]
pub struct Projection {
    pub(crate) config: ProjectionConfig,
    pub(crate) external_ids: Vec<String>,
    pub(crate) id_map: HashMap<String, usize>,
    pub(crate) node_labels: Vec<Vec<String>>,
    pub(crate) relationship_types: Vec<String>,
    pub(crate) type_orientations: Vec<Orientation>,
    pub(crate) outgoing: Adjacency,
    pub(crate) incoming: Option<Adjacency>,
    pub(crate) properties: PropertyStore,
}

impl Projection {
    /// Configuration the projection was built from
    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    pub fn node_count(&self) -> usize {
        self.external_ids.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.outgoing.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.external_ids.is_empty()
    }

    /// Resolve an external id to its internal index
    pub fn to_internal(&self, external_id: &str) -> Result<usize> {
        self.id_map
            .get(external_id)
            .copied()
            .ok_or_else(|| GraphError::NodeNotFound(external_id.to_string()))
    }

    /// External id of an internal index
    pub fn to_external(&self, index: usize) -> Option<&str> {
        self.external_ids.get(index).map(String::as_str)
    }

    /// Check that `index` addresses a node of this projection
    pub fn check_node(&self, index: usize) -> Result<()> {
        if index >= self.node_count() {
            return Err(GraphError::NodeNotFound(format!(
                "internal index {} (node count {})",
                index,
                self.node_count()
            )));
        }
        Ok(())
    }

    /// Retained labels of a node, sorted
    pub fn labels(&self, index: usize) -> Option<&[String]> {
        self.node_labels.get(index).map(Vec::as_slice)
    }

    pub fn has_label(&self, index: usize, label: &str) -> bool {
        self.labels(index)
            .is_some_and(|labels| labels.iter().any(|l| l == label))
    }

    /// Relationship type names, indexed by type id
    pub fn relationship_types(&self) -> &[String] {
        &self.relationship_types
    }

    pub fn type_id(&self, rel_type: &str) -> Option<usize> {
        self.relationship_types.iter().position(|t| t == rel_type)
    }

    /// Orientation a relationship type was projected with
    pub fn orientation(&self, type_id: usize) -> Option<Orientation> {
        self.type_orientations.get(type_id).copied()
    }

    pub fn out_degree(&self, node: usize) -> Option<usize> {
        (node < self.node_count()).then(|| self.outgoing.degree(node))
    }

    /// Successor indices in adjacency order; parallel relationships repeat
    pub fn successors(&self, node: usize) -> &[usize] {
        self.outgoing.neighbors(node)
    }

    /// Outgoing relationships of a node
    pub fn outgoing(&self, node: usize) -> impl Iterator<Item = Relationship> + '_ {
        self.outgoing
            .entries(node)
            .map(move |(target, index, type_id)| Relationship {
                index,
                source: node,
                target,
                type_id,
            })
    }

    /// Incoming relationships of a node, if an inverse index was built
    pub fn incoming(&self, node: usize) -> Option<impl Iterator<Item = Relationship> + '_> {
        self.incoming.as_ref().map(|adjacency| {
            adjacency
                .entries(node)
                .map(move |(source, index, type_id)| Relationship {
                    index,
                    source,
                    target: node,
                    type_id,
                })
        })
    }

    pub fn has_inverse_index(&self) -> bool {
        self.incoming.is_some()
    }

    /// Every relationship, ordered by source then adjacency position
    pub fn relationships(&self) -> impl Iterator<Item = Relationship> + '_ {
        (0..self.node_count()).flat_map(move |node| self.outgoing(node))
    }

    pub fn outgoing_adjacency(&self) -> &Adjacency {
        &self.outgoing
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    /// Node property value (or default)
    pub fn node_property(&self, index: usize, name: &str) -> Result<Option<PropertyValue>> {
        self.properties.get(EntityKind::Node, index, name)
    }

    /// Relationship property value (or default)
    pub fn relationship_property(&self, index: usize, name: &str) -> Result<Option<PropertyValue>> {
        self.properties.get(EntityKind::Relationship, index, name)
    }

    /// Snapshot of a relationship property that must hold scalars
    pub fn weight_column(&self, name: &str) -> Result<Arc<PropertyColumn>> {
        let column = self.properties.column(EntityKind::Relationship, name)?;
        if column.value_type() != crate::storage::value::ValueType::Double {
            return Err(GraphError::property_type(format!(
                "relationship property '{}' is {}, expected Double",
                name,
                column.value_type()
            )));
        }
        Ok(column)
    }

    /// Write a node property (mutate)
    pub fn mutate_node_property(&self, name: &str, values: Vec<PropertyValue>) -> Result<()> {
        self.properties.set_all(EntityKind::Node, name, values)
    }

    pub fn stats(&self) -> GraphStats {
        let mut labels: Vec<&String> = self.node_labels.iter().flatten().collect();
        labels.sort();
        labels.dedup();
        GraphStats {
            node_count: self.node_count(),
            relationship_count: self.relationship_count(),
            node_label_count: labels.len(),
            relationship_type_count: self.relationship_types.len(),
        }
    }
}
