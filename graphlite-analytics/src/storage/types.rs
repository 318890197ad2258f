// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Input record structures
//!
//! Defines the node and relationship records an external property graph
//! supplies to the projection builder.

use crate::storage::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node record with external id, labels, and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub external_id: String,
    pub labels: Vec<String>,
    pub properties: HashMap<String, Value>,
}

impl NodeRecord {
    /// Create a new node record with the given id
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            labels: Vec::new(),
            properties: HashMap::new(),
        }
    }

    /// Create a new node record with id and labels
    pub fn with_labels(external_id: impl Into<String>, labels: &[&str]) -> Self {
        let mut node = Self::new(external_id);
        for label in labels {
            node.add_label(label.to_string());
        }
        node
    }

    /// Builder-style property setter
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Add a label to this node
    pub fn add_label(&mut self, label: String) {
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    /// Check if node has a specific label
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Relationship record between two external node ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub source: String,
    pub target: String,
    pub rel_type: String,
    pub properties: HashMap<String, Value>,
}

impl RelationshipRecord {
    /// Create a new relationship record
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rel_type: rel_type.into(),
            properties: HashMap::new(),
        }
    }

    /// Builder-style property setter
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Get a property value
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Check if this relationship goes from `source` to `target`
    pub fn goes_from_to(&self, source: &str, target: &str) -> bool {
        self.source == source && self.target == target
    }
}
