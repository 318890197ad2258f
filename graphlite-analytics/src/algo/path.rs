// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shortest paths
//!
//! Dijkstra over the projection's outgoing adjacency. Unweighted searches use a
//! uniform weight of 1. The frontier is ordered by (distance, internal index)
//! so equal-cost alternatives resolve the same way on every run.

use crate::error::{GraphError, Result};
use crate::projection::graph::{Projection, Relationship};
use crate::storage::property_store::{EntityKind, PropertyColumn};
use log::{debug, warn};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;

/// Tolerance for heuristic consistency checks
const HEURISTIC_EPSILON: f64 = 1e-9;

/// Mean earth radius in nautical miles
const EARTH_RADIUS_NM: f64 = 3440.065;

/// A path through the projection
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Internal indices from source to target
    pub nodes: Vec<usize>,
    /// Cumulative cost at each node; `costs[0] == 0`
    pub costs: Vec<f64>,
    pub total_cost: f64,
}

impl Path {
    /// Number of relationships on the path
    pub fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// External ids of the path's nodes
    pub fn external_ids<'a>(&self, projection: &'a Projection) -> Vec<&'a str> {
        self.nodes
            .iter()
            .filter_map(|&n| projection.to_external(n))
            .collect()
    }
}

/// Distances and predecessors from one source
#[derive(Debug, Clone, PartialEq)]
pub struct ShortestPathTree {
    source: usize,
    distances: Vec<f64>,
    predecessors: Vec<Option<usize>>,
}

impl ShortestPathTree {
    pub fn source(&self) -> usize {
        self.source
    }

    /// Distance to `node`, `None` if unreachable
    pub fn distance(&self, node: usize) -> Option<f64> {
        self.distances
            .get(node)
            .copied()
            .filter(|d| d.is_finite())
    }

    /// Predecessor of `node` on its shortest path
    pub fn predecessor(&self, node: usize) -> Option<usize> {
        self.predecessors.get(node).copied().flatten()
    }

    /// Reconstruct the path to `target`
    pub fn path_to(&self, target: usize) -> Option<Path> {
        self.distance(target)?;
        let mut nodes = vec![target];
        let mut current = target;
        while let Some(previous) = self.predecessor(current) {
            nodes.push(previous);
            current = previous;
        }
        nodes.reverse();
        let costs: Vec<f64> = nodes.iter().map(|&n| self.distances[n]).collect();
        let total_cost = costs.last().copied().unwrap_or(0.0);
        Some(Path {
            nodes,
            costs,
            total_cost,
        })
    }

    /// `(index, distance, predecessor)` for every reachable node, by index
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64, Option<usize>)> + '_ {
        self.distances
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_finite())
            .map(|(i, &d)| (i, d, self.predecessors[i]))
    }

    pub fn reachable_count(&self) -> usize {
        self.iter().count()
    }
}

/// Relationship weights for a search
struct Weights {
    column: Option<Arc<PropertyColumn>>,
}

impl Weights {
    fn load(projection: &Projection, weight_property: Option<&str>) -> Result<Self> {
        let column = match weight_property {
            Some(name) => Some(projection.weight_column(name)?),
            None => None,
        };
        Ok(Self { column })
    }

    fn weight(&self, rel: &Relationship) -> Result<f64> {
        let Some(column) = &self.column else {
            return Ok(1.0);
        };
        let weight = column.double(rel.index).ok_or_else(|| {
            GraphError::property_type(format!(
                "relationship {} has no value for '{}'",
                rel.index,
                column.name()
            ))
        })?;
        if weight < 0.0 || weight.is_nan() {
            return Err(GraphError::NegativeWeight {
                source_index: rel.source,
                target_index: rel.target,
                weight,
            });
        }
        Ok(weight)
    }
}

/// Nodes and node pairs a search must not use
#[derive(Debug, Default)]
struct Blocked {
    nodes: HashSet<usize>,
    edges: HashSet<(usize, usize)>,
}

#[derive(Debug, PartialEq)]
struct FrontierEntry {
    priority: f64,
    node: usize,
}

impl Eq for FrontierEntry {}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse the comparison for min-heap behavior
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Core search; `heuristic` must already be known to be consistent
fn search(
    projection: &Projection,
    weights: &Weights,
    source: usize,
    target: Option<usize>,
    heuristic: Option<&dyn Fn(usize) -> f64>,
    blocked: &Blocked,
) -> Result<ShortestPathTree> {
    let n = projection.node_count();
    let h = |node: usize| heuristic.map_or(0.0, |h| h(node));

    let mut distances = vec![f64::INFINITY; n];
    let mut predecessors: Vec<Option<usize>> = vec![None; n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();

    distances[source] = 0.0;
    heap.push(FrontierEntry {
        priority: h(source),
        node: source,
    });

    while let Some(FrontierEntry { node: current, .. }) = heap.pop() {
        if settled[current] {
            continue;
        }
        settled[current] = true;
        if Some(current) == target {
            break;
        }

        for rel in projection.outgoing(current) {
            let weight = weights.weight(&rel)?;
            let next = rel.target;
            if settled[next]
                || blocked.nodes.contains(&next)
                || blocked.edges.contains(&(current, next))
            {
                continue;
            }
            let tentative = distances[current] + weight;
            if tentative < distances[next] {
                distances[next] = tentative;
                predecessors[next] = Some(current);
                heap.push(FrontierEntry {
                    priority: tentative + h(next),
                    node: next,
                });
            }
        }
    }

    Ok(ShortestPathTree {
        source,
        distances,
        predecessors,
    })
}

fn dijkstra(
    projection: &Projection,
    weights: &Weights,
    source: usize,
    target: Option<usize>,
    blocked: &Blocked,
) -> Result<ShortestPathTree> {
    search(projection, weights, source, target, None, blocked)
}

/// Why a heuristic cannot drive A*, if it cannot
fn heuristic_defect(
    projection: &Projection,
    weights: &Weights,
    target: usize,
    heuristic: &dyn Fn(usize) -> f64,
) -> Option<String> {
    if heuristic(target).abs() > HEURISTIC_EPSILON {
        return Some(format!("estimate at the target is {}", heuristic(target)));
    }
    if let Some(node) = (0..projection.node_count()).find(|&n| {
        let estimate = heuristic(n);
        !estimate.is_finite() || estimate < 0.0
    }) {
        return Some(format!("estimate at node {} is {}", node, heuristic(node)));
    }
    for rel in projection.relationships() {
        // Weight errors surface from the Dijkstra fallback if the edge is traversed
        let Ok(weight) = weights.weight(&rel) else {
            return Some(format!("relationship {} has an unusable weight", rel.index));
        };
        if weight + heuristic(rel.target) - heuristic(rel.source) < -HEURISTIC_EPSILON {
            return Some(format!(
                "negative reduced cost on {} -> {}",
                rel.source, rel.target
            ));
        }
    }
    None
}

/// Shortest path from `source` to `target`; `Ok(None)` if unreachable
pub fn shortest_path(
    projection: &Projection,
    source: usize,
    target: usize,
    weight_property: Option<&str>,
) -> Result<Option<Path>> {
    projection.check_node(source)?;
    projection.check_node(target)?;
    let weights = Weights::load(projection, weight_property)?;

    let tree = dijkstra(projection, &weights, source, Some(target), &Blocked::default())?;
    let path = tree.path_to(target);
    debug!(
        "Dijkstra {} -> {}: {}",
        source,
        target,
        path.as_ref()
            .map_or("no path".to_string(), |p| format!("cost {}", p.total_cost))
    );
    Ok(path)
}

/// Shortest paths from `source` to every reachable node
pub fn shortest_path_single_source(
    projection: &Projection,
    source: usize,
    weight_property: Option<&str>,
) -> Result<ShortestPathTree> {
    projection.check_node(source)?;
    let weights = Weights::load(projection, weight_property)?;
    let tree = dijkstra(projection, &weights, source, None, &Blocked::default())?;
    debug!(
        "Single-source Dijkstra from {} reached {} nodes",
        source,
        tree.reachable_count()
    );
    Ok(tree)
}

/// A* search guided by `heuristic` (estimated remaining cost to `target`).
///
/// The heuristic must be zero at the target, non-negative and consistent on
/// every relationship. Otherwise the search falls back to plain Dijkstra.
/// The returned path has the optimal cost; among equal-cost paths it need not
/// be the one [`shortest_path`] picks.
pub fn a_star<H>(
    projection: &Projection,
    source: usize,
    target: usize,
    weight_property: Option<&str>,
    heuristic: H,
) -> Result<Option<Path>>
where
    H: Fn(usize) -> f64,
{
    projection.check_node(source)?;
    projection.check_node(target)?;
    let weights = Weights::load(projection, weight_property)?;
    let blocked = Blocked::default();

    let tree = match heuristic_defect(projection, &weights, target, &heuristic) {
        None => search(
            projection,
            &weights,
            source,
            Some(target),
            Some(&heuristic as &dyn Fn(usize) -> f64),
            &blocked,
        )?,
        Some(defect) => {
            warn!("A* heuristic rejected ({}), falling back to Dijkstra", defect);
            dijkstra(projection, &weights, source, Some(target), &blocked)?
        }
    };
    Ok(tree.path_to(target))
}

/// Great-circle distance heuristic, in nautical miles, from each node to `target`.
///
/// Coordinates come from `Double` node properties in degrees. Nodes without
/// coordinates estimate 0.
pub fn geo_heuristic(
    projection: &Projection,
    latitude_property: &str,
    longitude_property: &str,
    target: usize,
) -> Result<impl Fn(usize) -> f64> {
    projection.check_node(target)?;
    let properties = projection.properties();
    let latitudes = properties.column(EntityKind::Node, latitude_property)?;
    let longitudes = properties.column(EntityKind::Node, longitude_property)?;

    let coordinates = move |node: usize| Some((latitudes.double(node)?, longitudes.double(node)?));
    let destination = coordinates(target);

    Ok(move |node: usize| match (coordinates(node), destination) {
        (Some(from), Some(to)) => haversine_nm(from, to),
        _ => 0.0,
    })
}

fn haversine_nm((lat1, lon1): (f64, f64), (lat2, lon2): (f64, f64)) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().min(1.0).asin()
}

/// Up to `k` loopless paths from `source` to `target`, cheapest first (Yen).
///
/// Paths of equal cost are ordered by their node sequence.
pub fn k_shortest_paths(
    projection: &Projection,
    source: usize,
    target: usize,
    k: usize,
    weight_property: Option<&str>,
) -> Result<Vec<Path>> {
    projection.check_node(source)?;
    projection.check_node(target)?;
    let weights = Weights::load(projection, weight_property)?;

    let mut accepted: Vec<Path> = Vec::new();
    if k == 0 {
        return Ok(accepted);
    }
    match dijkstra(projection, &weights, source, Some(target), &Blocked::default())?.path_to(target) {
        Some(first) => accepted.push(first),
        None => return Ok(accepted),
    }

    let mut candidates: Vec<Path> = Vec::new();
    while accepted.len() < k {
        let previous = accepted[accepted.len() - 1].clone();

        for spur_position in 0..previous.len() {
            let spur = previous.nodes[spur_position];
            let root = &previous.nodes[..=spur_position];

            let mut blocked = Blocked::default();
            for path in &accepted {
                if path.nodes.len() > spur_position + 1 && path.nodes[..=spur_position] == *root {
                    blocked.edges.insert((spur, path.nodes[spur_position + 1]));
                }
            }
            blocked.nodes.extend(root[..spur_position].iter().copied());

            let tree = dijkstra(projection, &weights, spur, Some(target), &blocked)?;
            let Some(spur_path) = tree.path_to(target) else {
                continue;
            };

            let root_cost = previous.costs[spur_position];
            let mut nodes = root[..spur_position].to_vec();
            nodes.extend(&spur_path.nodes);
            let mut costs = previous.costs[..spur_position].to_vec();
            costs.extend(spur_path.costs.iter().map(|c| c + root_cost));
            let candidate = Path {
                total_cost: costs.last().copied().unwrap_or(0.0),
                nodes,
                costs,
            };

            let known = accepted
                .iter()
                .chain(candidates.iter())
                .any(|p| p.nodes == candidate.nodes);
            if !known {
                candidates.push(candidate);
            }
        }

        if candidates.is_empty() {
            break;
        }
        candidates.sort_by(|a, b| {
            a.total_cost
                .total_cmp(&b.total_cost)
                .then_with(|| a.nodes.cmp(&b.nodes))
        });
        accepted.push(candidates.remove(0));
    }

    debug!(
        "Yen {} -> {}: found {} of {} requested paths",
        source,
        target,
        accepted.len(),
        k
    );
    Ok(accepted)
}
