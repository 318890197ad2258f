// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Centrality algorithms
//!
//! Degree centrality and PageRank over a projection. Both produce a
//! [`CentralityResult`]: one score per internal index, which can be streamed,
//! summarized, ranked, or written back as a node property.

use crate::algo::topk::TopK;
use crate::error::{GraphError, Result};
use crate::projection::config::Orientation;
use crate::projection::graph::{Adjacency, Projection};
use crate::storage::property_store::PropertyColumn;
use crate::storage::value::PropertyValue;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Scores indexed by internal node index
#[derive(Debug, Clone, PartialEq)]
pub struct CentralityResult {
    scores: Vec<f64>,
}

/// Summary of a score distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentralityStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
}

impl CentralityResult {
    pub fn new(scores: Vec<f64>) -> Self {
        Self { scores }
    }

    pub fn score(&self, node: usize) -> Option<f64> {
        self.scores.get(node).copied()
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// `(internal index, score)` in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.scores.iter().copied().enumerate()
    }

    /// `(external id, score)` in index order
    pub fn stream<'a>(
        &'a self,
        projection: &'a Projection,
    ) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.iter()
            .filter_map(move |(i, s)| projection.to_external(i).map(|id| (id, s)))
    }

    /// The `k` best nodes, score descending then index ascending
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut topk = TopK::new(k);
        for (node, score) in self.iter() {
            topk.add(node, score);
        }
        topk.into_sorted_vec()
    }

    /// Min, max, mean and sum; `None` for an empty result
    pub fn stats(&self) -> Option<CentralityStats> {
        if self.scores.is_empty() {
            return None;
        }
        let sum: f64 = self.scores.iter().sum();
        let (min, max) = self
            .scores
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            });
        Some(CentralityStats {
            min,
            max,
            mean: sum / self.scores.len() as f64,
            sum,
        })
    }

    /// Write the scores as a `Double` node property
    pub fn mutate(&self, projection: &Projection, property: &str) -> Result<()> {
        let values = self.scores.iter().map(|&s| PropertyValue::Double(s)).collect();
        projection.mutate_node_property(property, values)?;
        debug!("Wrote {} scores to node property '{}'", self.len(), property);
        Ok(())
    }
}

fn optional_weights(projection: &Projection, name: Option<&str>) -> Result<Option<Arc<PropertyColumn>>> {
    name.map(|n| projection.weight_column(n)).transpose()
}

/// Degree centrality.
///
/// `Natural` counts outgoing relationships, `Reverse` incoming ones and
/// `Undirected` both. With a weight property each relationship contributes its
/// weight; relationships without a value contribute 0.
pub fn degree(
    projection: &Projection,
    orientation: Orientation,
    weight_property: Option<&str>,
) -> Result<CentralityResult> {
    let weights = optional_weights(projection, weight_property)?;
    let weight = |index: usize| match &weights {
        Some(column) => column.double(index).unwrap_or(0.0),
        None => 1.0,
    };

    let n = projection.node_count();
    let outgoing: Vec<f64> = (0..n)
        .map(|node| projection.outgoing(node).fold(0.0, |acc, r| acc + weight(r.index)))
        .collect();

    let incoming = || -> Vec<f64> {
        if let Some(adjacency) = projection.incoming.as_ref() {
            (0..n)
                .map(|node| {
                    adjacency
                        .entries(node)
                        .fold(0.0, |acc, (_, index, _)| acc + weight(index))
                })
                .collect()
        } else {
            let mut totals = vec![0.0; n];
            for rel in projection.relationships() {
                totals[rel.target] += weight(rel.index);
            }
            totals
        }
    };

    let scores = match orientation {
        Orientation::Natural => outgoing,
        Orientation::Reverse => incoming(),
        Orientation::Undirected => outgoing
            .iter()
            .zip(incoming())
            .map(|(out, inc)| out + inc)
            .collect(),
    };
    debug!("Computed {} degree centrality for {} nodes", orientation, n);
    Ok(CentralityResult::new(scores))
}

/// PageRank configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    pub damping_factor: f64,
    pub max_iterations: usize,
    /// Convergence threshold on the L1 change between iterations
    pub tolerance: f64,
    /// Distribute score proportionally to this relationship property
    pub weight_property: Option<String>,
    /// External ids of the teleport set (personalized PageRank)
    pub source_nodes: Vec<String>,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            max_iterations: 20,
            tolerance: 1e-7,
            weight_property: None,
            source_nodes: Vec::new(),
        }
    }
}

impl PageRankConfig {
    pub fn with_damping_factor(mut self, damping_factor: f64) -> Self {
        self.damping_factor = damping_factor;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_weight_property(mut self, name: impl Into<String>) -> Self {
        self.weight_property = Some(name.into());
        self
    }

    pub fn with_source_nodes<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        self.source_nodes = ids.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.damping_factor) {
            return Err(GraphError::config(format!(
                "damping factor must be in [0, 1), got {}",
                self.damping_factor
            )));
        }
        if self.max_iterations == 0 {
            return Err(GraphError::config("max iterations must be at least 1"));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(GraphError::config(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// PageRank scores plus convergence information
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankResult {
    pub scores: CentralityResult,
    pub iterations: usize,
    pub converged: bool,
}

/// Teleport distribution: uniform, or uniform over the source set
fn teleport_vector(projection: &Projection, sources: &[String]) -> Result<Vec<f64>> {
    let n = projection.node_count();
    if sources.is_empty() {
        return Ok(vec![1.0 / n as f64; n]);
    }
    let indices = sources
        .iter()
        .map(|id| projection.to_internal(id))
        .collect::<Result<BTreeSet<usize>>>()?;
    let share = 1.0 / indices.len() as f64;
    let mut teleport = vec![0.0; n];
    for index in indices {
        teleport[index] = share;
    }
    Ok(teleport)
}

/// PageRank by power iteration.
///
/// Each node starts at 1/N. Nodes without outgoing weight hand their whole
/// score to the teleport distribution, so scores always sum to 1.
pub fn page_rank(projection: &Projection, config: &PageRankConfig) -> Result<PageRankResult> {
    config.validate()?;
    let n = projection.node_count();
    if n == 0 {
        return Ok(PageRankResult {
            scores: CentralityResult::new(Vec::new()),
            iterations: 0,
            converged: true,
        });
    }

    let weights = optional_weights(projection, config.weight_property.as_deref())?;
    let weight = |index: usize| match &weights {
        Some(column) => column.double(index).unwrap_or(0.0),
        None => 1.0,
    };

    let mut out_weight = vec![0.0; n];
    for rel in projection.relationships() {
        let value = weight(rel.index);
        if value < 0.0 || value.is_nan() {
            return Err(GraphError::NegativeWeight {
                source_index: rel.source,
                target_index: rel.target,
                weight: value,
            });
        }
        out_weight[rel.source] += value;
    }
    let teleport = teleport_vector(projection, &config.source_nodes)?;

    // Pull from predecessors so each node's update is independent
    let inverse: Cow<'_, Adjacency> = match projection.incoming.as_ref() {
        Some(adjacency) => Cow::Borrowed(adjacency),
        None => Cow::Owned(Adjacency::inverse_of(projection.outgoing_adjacency())),
    };
    let predecessors: Vec<Vec<(usize, f64)>> = (0..n)
        .map(|node| {
            inverse
                .entries(node)
                .filter(|&(source, _, _)| out_weight[source] > 0.0)
                .map(|(source, index, _)| (source, weight(index) / out_weight[source]))
                .collect()
        })
        .collect();

    let d = config.damping_factor;
    let mut scores = vec![1.0 / n as f64; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        let dangling: f64 = (0..n)
            .filter(|&node| out_weight[node] == 0.0)
            .map(|node| scores[node])
            .sum();

        let next: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|node| {
                let pulled: f64 = predecessors[node]
                    .iter()
                    .map(|&(source, share)| scores[source] * share)
                    .sum();
                (1.0 - d) * teleport[node] + d * (pulled + dangling * teleport[node])
            })
            .collect();

        let delta: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        iterations += 1;
        if delta < config.tolerance {
            converged = true;
            break;
        }
    }

    if converged {
        info!("PageRank converged after {} iterations over {} nodes", iterations, n);
    } else {
        warn!(
            "PageRank did not converge within {} iterations (tolerance {})",
            config.max_iterations, config.tolerance
        );
    }

    Ok(PageRankResult {
        scores: CentralityResult::new(scores),
        iterations,
        converged,
    })
}
