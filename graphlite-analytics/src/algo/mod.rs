// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph algorithms
//!
//! Every algorithm reads a [`Projection`](crate::projection::Projection) and
//! returns its results; only the explicit `mutate` helpers write back, and then
//! only into the property store.

pub mod centrality;
pub mod path;
pub mod similarity;
pub mod topk;

pub use centrality::{
    degree, page_rank, CentralityResult, CentralityStats, PageRankConfig, PageRankResult,
};
pub use path::{
    a_star, geo_heuristic, k_shortest_paths, shortest_path, shortest_path_single_source, Path,
    ShortestPathTree,
};
pub use similarity::{
    knn, node_similarity, KnnConfig, KnnMetric, NodeSimilarityConfig, SimilarityMetric,
    SimilarityPair,
};
pub use topk::TopK;
