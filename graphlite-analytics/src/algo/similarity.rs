// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Similarity algorithms
//!
//! - Node similarity: Jaccard or Overlap over out-neighbor sets, scoring only
//!   pairs that share at least one neighbor
//! - KNN: exact all-pairs comparison of a node property
//!
//! Both keep the top K partners of every node (score descending, partner index
//! ascending) and return pairs ordered by `node1` ascending, then rank. Nodes
//! are processed in parallel; each node's partner list is independent, so the
//! output does not depend on scheduling.

use crate::algo::topk::TopK;
use crate::error::{GraphError, Result};
use crate::projection::config::NodeFilter;
use crate::projection::graph::Projection;
use crate::storage::property_store::EntityKind;
use crate::storage::value::{PropertyValue, ValueType};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A scored, directed pair of internal indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityPair {
    pub node1: usize,
    pub node2: usize,
    pub score: f64,
}

impl SimilarityPair {
    /// External ids of both nodes
    pub fn external_ids<'a>(&self, projection: &'a Projection) -> Option<(&'a str, &'a str)> {
        Some((
            projection.to_external(self.node1)?,
            projection.to_external(self.node2)?,
        ))
    }
}

/// Set similarity over neighbor sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SimilarityMetric {
    /// |A ∩ B| / |A ∪ B|
    #[default]
    Jaccard,
    /// |A ∩ B| / min(|A|, |B|)
    Overlap,
}

impl SimilarityMetric {
    fn score(self, intersection: usize, left: usize, right: usize) -> f64 {
        let denominator = match self {
            SimilarityMetric::Jaccard => left + right - intersection,
            SimilarityMetric::Overlap => left.min(right),
        };
        if denominator == 0 {
            0.0
        } else {
            intersection as f64 / denominator as f64
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "JACCARD" => Ok(SimilarityMetric::Jaccard),
            "OVERLAP" => Ok(SimilarityMetric::Overlap),
            _ => Err(GraphError::config(format!(
                "invalid similarity metric '{}', expected JACCARD or OVERLAP",
                s
            ))),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityMetric::Jaccard => write!(f, "JACCARD"),
            SimilarityMetric::Overlap => write!(f, "OVERLAP"),
        }
    }
}

/// Node similarity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSimilarityConfig {
    /// Nodes taking part in the comparison
    pub label_filter: NodeFilter,
    pub metric: SimilarityMetric,
    /// Partners kept per node
    pub top_k: usize,
    /// Pairs scoring below this are dropped
    pub similarity_cutoff: f64,
    /// Nodes with fewer distinct neighbors are ignored
    pub degree_cutoff: usize,
    /// Keep only the N best pairs overall
    pub top_n: Option<usize>,
}

impl Default for NodeSimilarityConfig {
    fn default() -> Self {
        Self {
            label_filter: NodeFilter::All,
            metric: SimilarityMetric::Jaccard,
            top_k: 10,
            similarity_cutoff: 0.0,
            degree_cutoff: 1,
            top_n: None,
        }
    }
}

impl NodeSimilarityConfig {
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_label_filter(mut self, filter: NodeFilter) -> Self {
        self.label_filter = filter;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_similarity_cutoff(mut self, cutoff: f64) -> Self {
        self.similarity_cutoff = cutoff;
        self
    }

    pub fn with_degree_cutoff(mut self, cutoff: usize) -> Self {
        self.degree_cutoff = cutoff;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }
}

/// Keep the `top_n` best pairs overall: score descending, then indices ascending
fn limit_global(mut pairs: Vec<SimilarityPair>, top_n: usize) -> Vec<SimilarityPair> {
    pairs.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.node1.cmp(&b.node1))
            .then_with(|| a.node2.cmp(&b.node2))
    });
    pairs.truncate(top_n);
    pairs
}

fn into_pairs(node1: usize, topk: TopK<usize>) -> impl Iterator<Item = SimilarityPair> {
    topk.into_sorted_vec()
        .into_iter()
        .map(move |(node2, score)| SimilarityPair {
            node1,
            node2,
            score,
        })
}

/// Jaccard or Overlap similarity between out-neighbor sets.
///
/// Parallel relationships count once. With `top_n` set, the result is the
/// global best N pairs ordered by score instead of the per-node listing.
pub fn node_similarity(
    projection: &Projection,
    config: &NodeSimilarityConfig,
) -> Result<Vec<SimilarityPair>> {
    let n = projection.node_count();

    let neighbor_sets: Vec<Option<Vec<usize>>> = (0..n)
        .map(|node| {
            if !config.label_filter.matches(projection.labels(node).unwrap_or(&[])) {
                return None;
            }
            let mut set = projection.successors(node).to_vec();
            set.sort_unstable();
            set.dedup();
            (set.len() >= config.degree_cutoff.max(1)).then_some(set)
        })
        .collect();

    // neighbor -> compared nodes pointing at it
    let mut inverted: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (node, set) in neighbor_sets.iter().enumerate() {
        for &neighbor in set.iter().flatten() {
            inverted[neighbor].push(node);
        }
    }

    let pairs: Vec<SimilarityPair> = (0..n)
        .into_par_iter()
        .map(|node| {
            let mut topk = TopK::new(config.top_k);
            if let Some(set) = &neighbor_sets[node] {
                let mut intersections: HashMap<usize, usize> = HashMap::new();
                for &neighbor in set {
                    for &other in &inverted[neighbor] {
                        if other != node {
                            *intersections.entry(other).or_insert(0) += 1;
                        }
                    }
                }
                for (other, shared) in intersections {
                    let other_len = neighbor_sets[other].as_ref().map_or(0, Vec::len);
                    let score = config.metric.score(shared, set.len(), other_len);
                    if score >= config.similarity_cutoff {
                        topk.add(other, score);
                    }
                }
            }
            topk
        })
        .collect::<Vec<_>>()
        .into_iter()
        .enumerate()
        .flat_map(|(node, topk)| into_pairs(node, topk))
        .collect();

    debug!(
        "{} node similarity produced {} pairs over {} nodes",
        config.metric,
        pairs.len(),
        n
    );
    Ok(match config.top_n {
        Some(top_n) => limit_global(pairs, top_n),
        None => pairs,
    })
}

/// Metrics for comparing node properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KnnMetric {
    #[default]
    Cosine,
    Pearson,
    /// `1 / (1 + euclidean distance)`
    Euclidean,
    Jaccard,
    Overlap,
}

impl FromStr for KnnMetric {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "COSINE" => Ok(KnnMetric::Cosine),
            "PEARSON" => Ok(KnnMetric::Pearson),
            "EUCLIDEAN" => Ok(KnnMetric::Euclidean),
            "JACCARD" => Ok(KnnMetric::Jaccard),
            "OVERLAP" => Ok(KnnMetric::Overlap),
            _ => Err(GraphError::config(format!(
                "invalid knn metric '{}', expected one of COSINE, PEARSON, EUCLIDEAN, JACCARD, OVERLAP",
                s
            ))),
        }
    }
}

impl fmt::Display for KnnMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KnnMetric::Cosine => "COSINE",
            KnnMetric::Pearson => "PEARSON",
            KnnMetric::Euclidean => "EUCLIDEAN",
            KnnMetric::Jaccard => "JACCARD",
            KnnMetric::Overlap => "OVERLAP",
        };
        write!(f, "{}", name)
    }
}

/// KNN configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    /// Node property compared between nodes
    pub node_property: String,
    pub metric: KnnMetric,
    pub top_k: usize,
    pub similarity_cutoff: f64,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            node_property: String::new(),
            metric: KnnMetric::Cosine,
            top_k: 10,
            similarity_cutoff: 0.0,
        }
    }
}

impl KnnConfig {
    pub fn new(node_property: impl Into<String>, metric: KnnMetric) -> Self {
        Self {
            node_property: node_property.into(),
            metric,
            ..Self::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_similarity_cutoff(mut self, cutoff: f64) -> Self {
        self.similarity_cutoff = cutoff;
        self
    }
}

/// Per-node inputs for KNN; `None` marks nodes without a value
enum Features {
    Vectors(Vec<Option<Vec<f64>>>),
    Sets(Vec<Option<Vec<i64>>>),
}

impl Features {
    fn load(projection: &Projection, config: &KnnConfig) -> Result<Self> {
        let column = projection
            .properties()
            .column(EntityKind::Node, &config.node_property)?;
        let value_type = column.value_type();
        let accepted = match (config.metric, value_type) {
            (KnnMetric::Cosine | KnnMetric::Pearson, ValueType::DoubleArray(_)) => true,
            (KnnMetric::Euclidean, ValueType::DoubleArray(_) | ValueType::Double) => true,
            (KnnMetric::Jaccard | KnnMetric::Overlap, ValueType::LongArray) => true,
            _ => false,
        };
        if !accepted {
            return Err(GraphError::property_type(format!(
                "{} cannot compare property '{}' of type {}",
                config.metric, config.node_property, value_type
            )));
        }

        let n = projection.node_count();
        Ok(match value_type {
            ValueType::LongArray => Features::Sets(
                (0..n)
                    .map(|i| {
                        column.get(i).and_then(PropertyValue::as_long_array).map(|values| {
                            let mut set = values.to_vec();
                            set.sort_unstable();
                            set.dedup();
                            set
                        })
                    })
                    .collect(),
            ),
            ValueType::Double => Features::Vectors(
                (0..n)
                    .map(|i| column.double(i).map(|x| vec![x]))
                    .collect(),
            ),
            ValueType::DoubleArray(_) => Features::Vectors(
                (0..n)
                    .map(|i| {
                        column
                            .get(i)
                            .and_then(PropertyValue::as_double_array)
                            .map(<[f64]>::to_vec)
                    })
                    .collect(),
            ),
        })
    }
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let mean_a = a.iter().sum::<f64>() / a.len() as f64;
    let mean_b = b.iter().sum::<f64>() / b.len() as f64;
    let centered_a: Vec<f64> = a.iter().map(|x| x - mean_a).collect();
    let centered_b: Vec<f64> = b.iter().map(|x| x - mean_b).collect();
    cosine(&centered_a, &centered_b)
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    let distance = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt();
    1.0 / (1.0 + distance)
}

/// Size of the intersection of two sorted, deduplicated sets
fn intersection_size(a: &[i64], b: &[i64]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    shared
}

/// Exact k-nearest neighbors over a node property.
///
/// Cosine, Pearson and Euclidean read `DoubleArray` properties (Euclidean also
/// reads `Double`); Jaccard and Overlap read `LongArray` properties as sets.
/// Nodes without a value are skipped.
pub fn knn(projection: &Projection, config: &KnnConfig) -> Result<Vec<SimilarityPair>> {
    let features = Features::load(projection, config)?;
    let n = projection.node_count();

    let score = |i: usize, j: usize| -> Option<f64> {
        match &features {
            Features::Vectors(vectors) => {
                let (a, b) = (vectors[i].as_deref()?, vectors[j].as_deref()?);
                Some(match config.metric {
                    KnnMetric::Pearson => pearson(a, b),
                    KnnMetric::Euclidean => euclidean(a, b),
                    _ => cosine(a, b),
                })
            }
            Features::Sets(sets) => {
                let (a, b) = (sets[i].as_deref()?, sets[j].as_deref()?);
                let metric = match config.metric {
                    KnnMetric::Overlap => SimilarityMetric::Overlap,
                    _ => SimilarityMetric::Jaccard,
                };
                Some(metric.score(intersection_size(a, b), a.len(), b.len()))
            }
        }
    };

    let pairs: Vec<SimilarityPair> = (0..n)
        .into_par_iter()
        .map(|node| {
            let mut topk = TopK::new(config.top_k);
            for other in (0..n).filter(|&other| other != node) {
                match score(node, other) {
                    Some(s) if s >= config.similarity_cutoff => topk.add(other, s),
                    _ => {}
                }
            }
            topk
        })
        .collect::<Vec<_>>()
        .into_iter()
        .enumerate()
        .flat_map(|(node, topk)| into_pairs(node, topk))
        .collect();

    debug!(
        "{} knn on '{}' produced {} pairs over {} nodes",
        config.metric,
        config.node_property,
        pairs.len(),
        n
    );
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::config::{ProjectionConfig, PropertySpec, RelationshipSpec};
    use crate::storage::types::{NodeRecord, RelationshipRecord};
    use crate::storage::value::Value;

    fn bipartite() -> Projection {
        // alice and bob like the same items; carol shares one; dave nothing in common
        let nodes = vec![
            NodeRecord::with_labels("alice", &["Person"]),
            NodeRecord::with_labels("bob", &["Person"]),
            NodeRecord::with_labels("carol", &["Person"]),
            NodeRecord::with_labels("dave", &["Person"]),
            NodeRecord::with_labels("i1", &["Item"]),
            NodeRecord::with_labels("i2", &["Item"]),
            NodeRecord::with_labels("i3", &["Item"]),
        ];
        let rels = vec![
            RelationshipRecord::new("alice", "i1", "LIKES"),
            RelationshipRecord::new("alice", "i2", "LIKES"),
            RelationshipRecord::new("bob", "i1", "LIKES"),
            RelationshipRecord::new("bob", "i2", "LIKES"),
            RelationshipRecord::new("bob", "i2", "LIKES"),
            RelationshipRecord::new("carol", "i2", "LIKES"),
            RelationshipRecord::new("dave", "i3", "LIKES"),
        ];
        let config = ProjectionConfig::new().with_relationship("LIKES", RelationshipSpec::default());
        Projection::build(nodes, rels, &config).unwrap()
    }

    #[test]
    fn test_jaccard_identical_and_disjoint() {
        let p = bipartite();
        let pairs = node_similarity(&p, &NodeSimilarityConfig::default()).unwrap();

        let alice_bob = pairs.iter().find(|s| s.node1 == 0 && s.node2 == 1).unwrap();
        assert_eq!(alice_bob.score, 1.0);
        // dave shares nothing with anyone
        assert!(pairs.iter().all(|s| s.node1 != 3 && s.node2 != 3));

        let alice: Vec<_> = pairs.iter().filter(|s| s.node1 == 0).map(|s| (s.node2, s.score)).collect();
        assert_eq!(alice, vec![(1, 1.0), (2, 0.5)]);
    }

    #[test]
    fn test_overlap_and_top_k() {
        let p = bipartite();
        let config = NodeSimilarityConfig::default()
            .with_metric(SimilarityMetric::Overlap)
            .with_top_k(1);
        let pairs = node_similarity(&p, &config).unwrap();
        // carol's single item is contained in both alice and bob; alice wins the tie
        let carol: Vec<_> = pairs.iter().filter(|s| s.node1 == 2).collect();
        assert_eq!(carol.len(), 1);
        assert_eq!((carol[0].node2, carol[0].score), (0, 1.0));
    }

    #[test]
    fn test_cutoffs_and_top_n() {
        let p = bipartite();
        let strict = NodeSimilarityConfig::default().with_similarity_cutoff(0.75);
        let pairs = node_similarity(&p, &strict).unwrap();
        assert_eq!(pairs.len(), 2);

        let degree = NodeSimilarityConfig::default().with_degree_cutoff(2);
        let pairs = node_similarity(&p, &degree).unwrap();
        assert!(pairs.iter().all(|s| s.node1 != 2 && s.node2 != 2));

        let top = NodeSimilarityConfig::default().with_top_n(1);
        let pairs = node_similarity(&p, &top).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!((pairs[0].node1, pairs[0].node2), (0, 1));
    }

    fn embedded(values: Vec<(&str, PropertyValue)>) -> Projection {
        let nodes: Vec<_> = values
            .iter()
            .map(|(id, value)| {
                let value: Value = match value {
                    PropertyValue::Double(x) => (*x).into(),
                    PropertyValue::DoubleArray(v) => v.clone().into(),
                    PropertyValue::LongArray(v) => v.clone().into(),
                };
                NodeRecord::new(*id).property("p", value)
            })
            .collect();
        let config = ProjectionConfig::new().with_node_property(PropertySpec::new("p"));
        Projection::build(nodes, Vec::<RelationshipRecord>::new(), &config).unwrap()
    }

    #[test]
    fn test_knn_cosine() {
        let p = embedded(vec![
            ("a", PropertyValue::DoubleArray(vec![1.0, 0.0])),
            ("b", PropertyValue::DoubleArray(vec![2.0, 0.0])),
            ("c", PropertyValue::DoubleArray(vec![0.0, 1.0])),
        ]);
        let pairs = knn(&p, &KnnConfig::new("p", KnnMetric::Cosine).with_top_k(1)).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!((pairs[0].node1, pairs[0].node2), (0, 1));
        assert!((pairs[0].score - 1.0).abs() < 1e-12);
        // c is orthogonal to both; the tie goes to the lower index
        assert_eq!((pairs[2].node1, pairs[2].node2, pairs[2].score), (2, 0, 0.0));
    }

    #[test]
    fn test_knn_euclidean_on_scalars() {
        let p = embedded(vec![
            ("a", PropertyValue::Double(1.0)),
            ("b", PropertyValue::Double(2.0)),
            ("c", PropertyValue::Double(5.0)),
        ]);
        let pairs = knn(&p, &KnnConfig::new("p", KnnMetric::Euclidean).with_top_k(1)).unwrap();
        assert_eq!((pairs[0].node2, pairs[0].score), (1, 0.5));
        assert_eq!((pairs[2].node2, pairs[2].score), (1, 0.25));
    }

    #[test]
    fn test_knn_jaccard_on_long_arrays() {
        let p = embedded(vec![
            ("a", PropertyValue::LongArray(vec![1, 2, 3])),
            ("b", PropertyValue::LongArray(vec![2, 3, 4])),
        ]);
        let pairs = knn(&p, &KnnConfig::new("p", KnnMetric::Jaccard)).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].score, 0.5);
    }

    #[test]
    fn test_knn_pearson() {
        let p = embedded(vec![
            ("a", PropertyValue::DoubleArray(vec![1.0, 2.0, 3.0])),
            ("b", PropertyValue::DoubleArray(vec![2.0, 4.0, 6.0])),
            ("c", PropertyValue::DoubleArray(vec![3.0, 2.0, 1.0])),
        ]);
        let config = KnnConfig::new("p", KnnMetric::Pearson).with_similarity_cutoff(-1.0);
        let pairs = knn(&p, &config).unwrap();
        let a_c = pairs.iter().find(|s| s.node1 == 0 && s.node2 == 2).unwrap();
        assert!((a_c.score + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_knn_rejects_wrong_type() {
        let p = embedded(vec![("a", PropertyValue::Double(1.0))]);
        let err = knn(&p, &KnnConfig::new("p", KnnMetric::Cosine)).unwrap_err();
        assert!(matches!(err, GraphError::PropertyType(_)));

        let err = knn(&p, &KnnConfig::new("missing", KnnMetric::Cosine)).unwrap_err();
        assert!(matches!(err, GraphError::PropertyNotFound(_)));
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("overlap".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::Overlap);
        assert_eq!("PEARSON".parse::<KnnMetric>().unwrap(), KnnMetric::Pearson);
        assert!(matches!("manhattan".parse::<KnnMetric>(), Err(GraphError::Config(_))));
    }
}
