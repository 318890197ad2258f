// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Projection configuration
//!
//! Describes which nodes and relationships a projection keeps, how
//! relationships are oriented and aggregated, and which properties are loaded.
//! All types deserialize from JSON; enum values use upper-case names
//! (`"UNDIRECTED"`, `"SUM"`).

use crate::error::{GraphError, Result};
use crate::storage::value::{PropertyValue, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Key of the relationship spec that applies to every type not named explicitly
pub const WILDCARD: &str = "*";

/// Direction policy applied to relationships at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Orientation {
    /// Keep direction as given
    #[default]
    Natural,
    /// Swap source and target
    Reverse,
    /// Materialize both directions
    Undirected,
}

impl FromStr for Orientation {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NATURAL" => Ok(Orientation::Natural),
            "REVERSE" => Ok(Orientation::Reverse),
            "UNDIRECTED" => Ok(Orientation::Undirected),
            _ => Err(GraphError::config(format!(
                "invalid orientation '{}', expected one of NATURAL, REVERSE, UNDIRECTED",
                s
            ))),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Natural => write!(f, "NATURAL"),
            Orientation::Reverse => write!(f, "REVERSE"),
            Orientation::Undirected => write!(f, "UNDIRECTED"),
        }
    }
}

/// How parallel relationships with the same (source, target, type) are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregation {
    Sum,
    Min,
    Max,
    /// Property value becomes the number of merged relationships
    Count,
    /// Keep the first relationship's value
    Single,
}

impl FromStr for Aggregation {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SUM" => Ok(Aggregation::Sum),
            "MIN" => Ok(Aggregation::Min),
            "MAX" => Ok(Aggregation::Max),
            "COUNT" => Ok(Aggregation::Count),
            "SINGLE" => Ok(Aggregation::Single),
            _ => Err(GraphError::config(format!(
                "invalid aggregation '{}', expected one of SUM, MIN, MAX, COUNT, SINGLE",
                s
            ))),
        }
    }
}

/// Node label filter
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "NodeFilterRepr", into = "NodeFilterRepr")]
pub enum NodeFilter {
    /// Every node, with all of its labels
    #[default]
    All,
    /// Nodes carrying at least one of these labels
    Labels(BTreeSet<String>),
}

impl NodeFilter {
    /// Filter on the given labels
    pub fn labels(labels: &[&str]) -> Self {
        NodeFilter::Labels(labels.iter().map(|l| l.to_string()).collect())
    }

    /// Whether a node with these labels passes the filter
    pub fn matches<S: AsRef<str>>(&self, labels: &[S]) -> bool {
        match self {
            NodeFilter::All => true,
            NodeFilter::Labels(set) => labels.iter().any(|l| set.contains(l.as_ref())),
        }
    }

    /// Whether `label` is included by the filter
    pub fn includes(&self, label: &str) -> bool {
        match self {
            NodeFilter::All => true,
            NodeFilter::Labels(set) => set.contains(label),
        }
    }

    /// Labels of a passing node that the projection retains
    pub fn retained<S: AsRef<str>>(&self, labels: &[S]) -> Vec<String> {
        let mut kept: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref())
            .filter(|l| self.includes(l))
            .map(str::to_string)
            .collect();
        kept.sort();
        kept.dedup();
        kept
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NodeFilterRepr {
    One(String),
    Many(Vec<String>),
}

impl TryFrom<NodeFilterRepr> for NodeFilter {
    type Error = String;

    fn try_from(repr: NodeFilterRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            NodeFilterRepr::One(label) if label == WILDCARD => Ok(NodeFilter::All),
            NodeFilterRepr::One(label) => Ok(NodeFilter::Labels(BTreeSet::from([label]))),
            NodeFilterRepr::Many(labels) if labels.iter().any(|l| l == WILDCARD) => {
                Ok(NodeFilter::All)
            }
            NodeFilterRepr::Many(labels) if labels.is_empty() => {
                Err("node filter must name at least one label or '*'".to_string())
            }
            NodeFilterRepr::Many(labels) => Ok(NodeFilter::Labels(labels.into_iter().collect())),
        }
    }
}

impl From<NodeFilter> for NodeFilterRepr {
    fn from(filter: NodeFilter) -> Self {
        match filter {
            NodeFilter::All => NodeFilterRepr::One(WILDCARD.to_string()),
            NodeFilter::Labels(set) => NodeFilterRepr::Many(set.into_iter().collect()),
        }
    }
}

/// A property to load into the projection
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertySpec {
    /// Name in the projection's property store
    pub name: String,

    /// Key on the input record, defaults to `name`
    pub source: Option<String>,

    /// Value used when a record has no value
    pub default: Option<PropertyValue>,

    /// Declared shape; inferred from the default or the first value if absent
    pub value_type: Option<ValueType>,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<PropertyValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Read the value from a differently named record key
    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Declare the shape explicitly
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// Record key this property is read from
    pub fn source_key(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    /// Shape implied by the explicit type or the default
    pub fn declared_type(&self) -> Option<ValueType> {
        self.value_type
            .or_else(|| self.default.as_ref().map(|d| d.value_type()))
    }
}

/// Projection rules for one relationship type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipSpec {
    pub orientation: Orientation,

    /// Merge parallel relationships; `None` keeps them distinct
    pub aggregation: Option<Aggregation>,

    pub properties: Vec<PropertySpec>,

    /// Only keep relationships whose source carries this label
    pub source_label: Option<String>,

    /// Only keep relationships whose target carries this label
    pub target_label: Option<String>,

    /// Also build an index of incoming relationships
    pub index_inverse: bool,
}

impl RelationshipSpec {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            ..Default::default()
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn with_property(mut self, property: PropertySpec) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_endpoint_labels(
        mut self,
        source_label: Option<&str>,
        target_label: Option<&str>,
    ) -> Self {
        self.source_label = source_label.map(str::to_string);
        self.target_label = target_label.map(str::to_string);
        self
    }

    pub fn with_inverse_index(mut self) -> Self {
        self.index_inverse = true;
        self
    }
}

/// Full configuration of a projection build
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub node_filter: NodeFilter,

    /// Relationship type -> projection rules; the `*` key covers unnamed types
    pub relationship_specs: BTreeMap<String, RelationshipSpec>,

    pub node_properties: Vec<PropertySpec>,
}

impl ProjectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the projection to nodes with any of these labels
    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.node_filter = NodeFilter::labels(labels);
        self
    }

    /// Project a relationship type (or `*`)
    pub fn with_relationship(mut self, rel_type: &str, spec: RelationshipSpec) -> Self {
        self.relationship_specs.insert(rel_type.to_string(), spec);
        self
    }

    /// Load a node property
    pub fn with_node_property(mut self, property: PropertySpec) -> Self {
        self.node_properties.push(property);
        self
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Spec that applies to `rel_type`, if the type is projected
    pub fn spec_for(&self, rel_type: &str) -> Option<&RelationshipSpec> {
        self.relationship_specs
            .get(rel_type)
            .or_else(|| self.relationship_specs.get(WILDCARD))
    }

    /// Whether any relationship type asks for an incoming index
    pub fn index_inverse(&self) -> bool {
        self.relationship_specs.values().any(|s| s.index_inverse)
    }

    /// Check filter/spec consistency
    pub fn validate(&self) -> Result<()> {
        for (rel_type, spec) in &self.relationship_specs {
            if rel_type.is_empty() {
                return Err(GraphError::config("relationship type must not be empty"));
            }
            for label in spec.source_label.iter().chain(spec.target_label.iter()) {
                if !self.node_filter.includes(label) {
                    return Err(GraphError::schema(format!(
                        "relationship type '{}' references label '{}' which is not in the node filter",
                        rel_type, label
                    )));
                }
            }
            if spec.aggregation.is_some() && spec.properties.iter().any(|p| {
                matches!(p.declared_type(), Some(t) if t != ValueType::Double)
            }) && spec.aggregation != Some(Aggregation::Single)
            {
                return Err(GraphError::schema(format!(
                    "relationship type '{}' aggregates a non-scalar property",
                    rel_type
                )));
            }
        }

        check_unique(
            "node",
            self.node_properties.iter().map(|p| p.name.as_str()),
        )?;

        // Relationship properties share one column per name across types
        let mut declared: HashMap<&str, &PropertySpec> = HashMap::new();
        for (rel_type, spec) in &self.relationship_specs {
            check_unique(
                &format!("relationship type '{}'", rel_type),
                spec.properties.iter().map(|p| p.name.as_str()),
            )?;
            for property in &spec.properties {
                if let Some(previous) = declared.insert(property.name.as_str(), property) {
                    if previous.default != property.default
                        || previous.declared_type() != property.declared_type()
                    {
                        return Err(GraphError::schema(format!(
                            "relationship property '{}' is declared with conflicting shapes or defaults",
                            property.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_unique<'a>(owner: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if name.is_empty() {
            return Err(GraphError::config(format!("{}: property name must not be empty", owner)));
        }
        if !seen.insert(name) {
            return Err(GraphError::schema(format!(
                "{}: property '{}' declared twice",
                owner, name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_parsing() {
        assert_eq!("undirected".parse::<Orientation>().unwrap(), Orientation::Undirected);
        let err = "SIDEWAYS".parse::<Orientation>().unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }

    #[test]
    fn test_config_from_json() {
        let config = ProjectionConfig::from_json(
            r#"{
                "node_filter": ["City"],
                "relationship_specs": {
                    "ROAD": {
                        "orientation": "UNDIRECTED",
                        "aggregation": "MIN",
                        "properties": [{ "name": "distance", "default": { "Double": 1.0 } }]
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.node_filter, NodeFilter::labels(&["City"]));
        let road = config.spec_for("ROAD").unwrap();
        assert_eq!(road.orientation, Orientation::Undirected);
        assert_eq!(road.aggregation, Some(Aggregation::Min));
        assert_eq!(road.properties[0].declared_type(), Some(ValueType::Double));
        assert!(config.spec_for("RAIL").is_none());
    }

    #[test]
    fn test_invalid_orientation_in_json_is_config_error() {
        let err = ProjectionConfig::from_json(
            r#"{ "relationship_specs": { "ROAD": { "orientation": "BOTH" } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }

    #[test]
    fn test_wildcard_filter_round_trip() {
        let config = ProjectionConfig::from_json(r#"{ "node_filter": "*" }"#).unwrap();
        assert_eq!(config.node_filter, NodeFilter::All);
        let json = config.to_json().unwrap();
        assert!(json.contains("\"*\""));
    }

    #[test]
    fn test_endpoint_label_outside_filter_is_schema_error() {
        let config = ProjectionConfig::new().with_labels(&["Person"]).with_relationship(
            "WORKS_AT",
            RelationshipSpec::new(Orientation::Natural)
                .with_endpoint_labels(Some("Person"), Some("Company")),
        );
        assert!(matches!(config.validate(), Err(GraphError::Schema(_))));
    }

    #[test]
    fn test_conflicting_relationship_property_defaults() {
        let config = ProjectionConfig::new()
            .with_relationship(
                "A",
                RelationshipSpec::default().with_property(PropertySpec::new("w").with_default(1.0)),
            )
            .with_relationship(
                "B",
                RelationshipSpec::default().with_property(PropertySpec::new("w").with_default(2.0)),
            );
        assert!(matches!(config.validate(), Err(GraphError::Schema(_))));
    }

    #[test]
    fn test_retained_labels() {
        let filter = NodeFilter::labels(&["A", "B"]);
        assert!(filter.matches(&["C", "B"]));
        assert!(!filter.matches(&["C"]));
        assert_eq!(filter.retained(&["C", "B", "A"]), vec!["A", "B"]);
    }
}
