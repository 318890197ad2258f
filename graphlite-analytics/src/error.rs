// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for projection building and graph algorithms

use thiserror::Error;

/// Errors raised by projection building, property access and algorithms
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(
        "Dangling relationship ({source_id})-[:{rel_type}]->({target_id}): endpoint not in projected node set"
    )]
    DanglingReference {
        source_id: String,
        target_id: String,
        rel_type: String,
    },

    #[error("Type mismatch for property '{property}': expected {expected}, got {actual}")]
    TypeMismatch {
        property: String,
        expected: String,
        actual: String,
    },

    #[error("Property type error: {0}")]
    PropertyType(String),

    #[error("Negative weight {weight} on relationship {source_index} -> {target_index}")]
    NegativeWeight {
        source_index: usize,
        target_index: usize,
        weight: f64,
    },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Projection already exists: {0}")]
    ProjectionExists(String),

    #[error("Projection not found: {0}")]
    ProjectionNotFound(String),

    #[error("Projection '{name}' is still referenced by {handles} other handle(s)")]
    ProjectionInUse { name: String, handles: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Create a schema error
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a property type error
    pub fn property_type<S: Into<String>>(msg: S) -> Self {
        Self::PropertyType(msg.into())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(error: serde_json::Error) -> Self {
        GraphError::Config(error.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GraphError>;
