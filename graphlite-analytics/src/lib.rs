// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphLite Analytics - in-memory graph projections and algorithms
//!
//! Builds an immutable, queryable projection of a property graph and runs
//! analytics over it.
//!
//! # Features
//!
//! - **Projections**: label filters, NATURAL/REVERSE/UNDIRECTED orientation,
//!   parallel-relationship aggregation, compressed sparse row adjacency
//! - **Property Store**: typed node and relationship columns with defaults and
//!   copy-on-write mutation
//! - **Path Finding**: Dijkstra, single-source trees, A*, Yen's k shortest paths
//! - **Centrality**: degree and (weighted, personalized) PageRank
//! - **Similarity**: Jaccard/Overlap node similarity and property-based KNN
//! - **Catalog**: named projections with safe dropping
//!
//! # Usage
//!
//! ```ignore
//! use graphlite_analytics::{NodeRecord, Projection, ProjectionConfig, RelationshipRecord,
//!     RelationshipSpec, algo};
//!
//! let nodes = vec![NodeRecord::new("A"), NodeRecord::new("B")];
//! let rels = vec![RelationshipRecord::new("A", "B", "ROAD")];
//! let config = ProjectionConfig::new().with_relationship("ROAD", RelationshipSpec::default());
//! let projection = Projection::build(nodes, rels, &config)?;
//! let path = algo::shortest_path(&projection, 0, 1, None)?;
//! ```

pub mod algo;
pub mod catalog;
pub mod error;
pub mod projection;
pub mod storage;

pub use catalog::{ProjectionCatalog, ProjectionInfo};
pub use error::{GraphError, Result};
pub use projection::{
    collapse_path, Aggregation, NodeFilter, Orientation, Projection, ProjectionConfig,
    PropertySpec, RelationshipSpec,
};
pub use storage::{
    EntityKind, NodeRecord, PropertyStore, PropertyValue, RelationshipRecord, Value, ValueType,
};

/// GraphLite Analytics version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GraphLite Analytics crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
