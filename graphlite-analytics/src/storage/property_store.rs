// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Projection-scoped property store
//!
//! Properties are stored column-wise: one column per (entity kind, property
//! name), indexed by internal node index or relationship index. Every column
//! carries a declared [`ValueType`] and an optional default that hold for the
//! lifetime of the store.
//!
//! Columns live behind `Arc` and are replaced copy-on-write, so a writer never
//! disturbs a reader that already holds a snapshot. [`PropertyStore::stream`]
//! hands out such a snapshot.

use crate::error::{GraphError, Result};
use crate::storage::value::{PropertyValue, ValueType};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Kind of entity a property is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Node,
    Relationship,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Node => write!(f, "node"),
            EntityKind::Relationship => write!(f, "relationship"),
        }
    }
}

/// Declared shape and default of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub value_type: ValueType,
    pub default: Option<PropertyValue>,
}

impl PropertySchema {
    /// Create a schema, checking that the default has the declared shape
    pub fn new(name: &str, value_type: ValueType, default: Option<PropertyValue>) -> Result<Self> {
        if let Some(default) = &default {
            check_shape(name, value_type, default)?;
        }
        Ok(Self {
            value_type,
            default,
        })
    }
}

fn check_shape(name: &str, expected: ValueType, value: &PropertyValue) -> Result<()> {
    let actual = value.value_type();
    if actual != expected {
        return Err(GraphError::TypeMismatch {
            property: name.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// One property column
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyColumn {
    name: String,
    schema: PropertySchema,
    values: Vec<Option<PropertyValue>>,
}

impl PropertyColumn {
    /// Create a column of `len` entries, all unset
    pub fn new(name: impl Into<String>, schema: PropertySchema, len: usize) -> Self {
        Self {
            name: name.into(),
            schema,
            values: vec![None; len],
        }
    }

    /// Create a column from explicit values, checking each against the schema
    pub fn from_values(
        name: impl Into<String>,
        schema: PropertySchema,
        values: Vec<Option<PropertyValue>>,
    ) -> Result<Self> {
        let name = name.into();
        for value in values.iter().flatten() {
            check_shape(&name, schema.value_type, value)?;
        }
        Ok(Self {
            name,
            schema,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    pub fn value_type(&self) -> ValueType {
        self.schema.value_type
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, falling back to the declared default
    pub fn get(&self, index: usize) -> Option<&PropertyValue> {
        self.values
            .get(index)
            .and_then(|v| v.as_ref())
            .or(self.schema.default.as_ref())
    }

    /// Scalar at `index` (value or default), `None` if absent or not a scalar
    pub fn double(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|v| v.as_double())
    }

    /// Whether an explicit value (not the default) is stored at `index`
    pub fn has_value(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(Some(_)))
    }

    fn set(&mut self, index: usize, value: PropertyValue) -> Result<()> {
        check_shape(&self.name, self.schema.value_type, &value)?;
        if index >= self.values.len() {
            self.values.resize(index + 1, None);
        }
        self.values[index] = Some(value);
        Ok(())
    }
}

/// Snapshot of one property column.
///
/// Iterating a stream always starts from the beginning and always sees the
/// values that were current when the stream was opened.
#[derive(Debug, Clone)]
pub struct PropertyStream {
    column: Arc<PropertyColumn>,
}

impl PropertyStream {
    /// Iterate `(index, value)` pairs; entries without a value or default are skipped
    pub fn iter(&self) -> impl Iterator<Item = (usize, &PropertyValue)> + '_ {
        (0..self.column.len()).filter_map(move |i| self.column.get(i).map(|v| (i, v)))
    }

    pub fn column(&self) -> &PropertyColumn {
        &self.column
    }
}

impl<'a> IntoIterator for &'a PropertyStream {
    type Item = (usize, &'a PropertyValue);
    type IntoIter = Box<dyn Iterator<Item = (usize, &'a PropertyValue)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

type Columns = BTreeMap<String, Arc<PropertyColumn>>;

/// Node and relationship property columns of one projection
#[derive(Debug, Default)]
pub struct PropertyStore {
    node_count: usize,
    relationship_count: usize,
    nodes: RwLock<Columns>,
    relationships: RwLock<Columns>,
}

impl Clone for PropertyStore {
    fn clone(&self) -> Self {
        Self {
            node_count: self.node_count,
            relationship_count: self.relationship_count,
            nodes: RwLock::new(self.nodes.read().clone()),
            relationships: RwLock::new(self.relationships.read().clone()),
        }
    }
}

impl PropertyStore {
    /// Create an empty store sized for the given entity counts
    pub fn new(node_count: usize, relationship_count: usize) -> Self {
        Self {
            node_count,
            relationship_count,
            nodes: RwLock::new(BTreeMap::new()),
            relationships: RwLock::new(BTreeMap::new()),
        }
    }

    fn columns(&self, kind: EntityKind) -> &RwLock<Columns> {
        match kind {
            EntityKind::Node => &self.nodes,
            EntityKind::Relationship => &self.relationships,
        }
    }

    fn entity_count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Node => self.node_count,
            EntityKind::Relationship => self.relationship_count,
        }
    }

    fn check_index(&self, kind: EntityKind, index: usize) -> Result<()> {
        let count = self.entity_count(kind);
        if index >= count {
            let detail = format!("{} index {} out of range (count {})", kind, index, count);
            return Err(match kind {
                EntityKind::Node => GraphError::NodeNotFound(detail),
                EntityKind::Relationship => GraphError::RelationshipNotFound(detail),
            });
        }
        Ok(())
    }

    /// Install a fully built column. Fails if the name is already declared.
    pub fn insert_column(&self, kind: EntityKind, column: PropertyColumn) -> Result<()> {
        let mut columns = self.columns(kind).write();
        if columns.contains_key(column.name()) {
            return Err(GraphError::schema(format!(
                "{} property '{}' declared twice",
                kind,
                column.name()
            )));
        }
        columns.insert(column.name().to_string(), Arc::new(column));
        Ok(())
    }

    /// Declare a property with no values set yet
    pub fn declare(&self, kind: EntityKind, name: &str, schema: PropertySchema) -> Result<()> {
        let len = self.entity_count(kind);
        self.insert_column(kind, PropertyColumn::new(name, schema, len))
    }

    /// Check whether a property is declared
    pub fn contains(&self, kind: EntityKind, name: &str) -> bool {
        self.columns(kind).read().contains_key(name)
    }

    /// Declared properties of a kind, ordered by name
    pub fn schema(&self, kind: EntityKind) -> Vec<(String, PropertySchema)> {
        self.columns(kind)
            .read()
            .values()
            .map(|c| (c.name().to_string(), c.schema().clone()))
            .collect()
    }

    /// Snapshot of a single column
    pub fn column(&self, kind: EntityKind, name: &str) -> Result<Arc<PropertyColumn>> {
        self.columns(kind)
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::PropertyNotFound(format!("{} property '{}'", kind, name)))
    }

    /// Value of `name` at `index`, or the declared default
    pub fn get(&self, kind: EntityKind, index: usize, name: &str) -> Result<Option<PropertyValue>> {
        self.check_index(kind, index)?;
        Ok(self.column(kind, name)?.get(index).cloned())
    }

    /// Write a single value.
    ///
    /// An undeclared name is declared with the shape of `value` and no default.
    pub fn set(&self, kind: EntityKind, index: usize, name: &str, value: PropertyValue) -> Result<()> {
        self.check_index(kind, index)?;
        let len = self.entity_count(kind);
        let mut columns = self.columns(kind).write();
        let column = columns.entry(name.to_string()).or_insert_with(|| {
            let schema = PropertySchema {
                value_type: value.value_type(),
                default: None,
            };
            Arc::new(PropertyColumn::new(name, schema, len))
        });
        Arc::make_mut(column).set(index, value)
    }

    /// Replace a whole column with one value per entity.
    ///
    /// If the name is already declared the new values must match its shape and
    /// the declared default is kept.
    pub fn set_all(&self, kind: EntityKind, name: &str, values: Vec<PropertyValue>) -> Result<()> {
        let len = self.entity_count(kind);
        if values.len() != len {
            return Err(GraphError::config(format!(
                "{} property '{}' expects {} values, got {}",
                kind,
                name,
                len,
                values.len()
            )));
        }

        let mut columns = self.columns(kind).write();
        let schema = match columns.get(name) {
            Some(existing) => existing.schema().clone(),
            None => match values.first() {
                Some(first) => PropertySchema {
                    value_type: first.value_type(),
                    default: None,
                },
                None => PropertySchema {
                    value_type: ValueType::Double,
                    default: None,
                },
            },
        };
        let column = PropertyColumn::from_values(name, schema, values.into_iter().map(Some).collect())?;
        columns.insert(name.to_string(), Arc::new(column));
        Ok(())
    }

    /// Open a snapshot stream over one property
    pub fn stream(&self, kind: EntityKind, name: &str) -> Result<PropertyStream> {
        Ok(PropertyStream {
            column: self.column(kind, name)?,
        })
    }

    /// Copy of this store with relationships renumbered.
    ///
    /// `mapping[new_index]` names the relationship whose explicit values move to
    /// `new_index`; `None` leaves the slot to the column default. Node columns
    /// are shared with `self` until either side writes.
    pub(crate) fn remap_relationships(&self, mapping: &[Option<usize>]) -> Result<Self> {
        let mut relationships = Columns::new();
        for (name, column) in self.relationships.read().iter() {
            let values = mapping
                .iter()
                .map(|old| old.and_then(|i| column.values.get(i).cloned().flatten()))
                .collect();
            let remapped = PropertyColumn::from_values(name.clone(), column.schema().clone(), values)?;
            relationships.insert(name.clone(), Arc::new(remapped));
        }
        Ok(Self {
            node_count: self.node_count,
            relationship_count: mapping.len(),
            nodes: RwLock::new(self.nodes.read().clone()),
            relationships: RwLock::new(relationships),
        })
    }
}
