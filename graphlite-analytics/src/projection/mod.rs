// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph projections
//!
//! This module provides:
//! - Projection configuration (label filter, orientation, aggregation, properties)
//! - The builder turning input records into an immutable projection
//! - Compressed sparse row adjacency with an optional inverse index
//! - Transformations producing new projections

pub mod builder;
pub mod config;
pub mod graph;
pub mod transform;

pub use builder::build;
pub use config::{
    Aggregation, NodeFilter, Orientation, ProjectionConfig, PropertySpec, RelationshipSpec, WILDCARD,
};
pub use graph::{Adjacency, GraphStats, Projection, Relationship};
pub use transform::collapse_path;
