// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Projection catalog
//!
//! A named registry of built projections. The catalog hands out
//! `Arc<Projection>` handles and refuses to drop a projection while any of
//! those handles is still alive.

use crate::error::{GraphError, Result};
use crate::projection::config::ProjectionConfig;
use crate::projection::graph::Projection;
use crate::storage::property_store::EntityKind;
use crate::storage::types::{NodeRecord, RelationshipRecord};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::sync::Arc;

/// Summary of a catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionInfo {
    pub name: String,
    pub node_count: usize,
    pub relationship_count: usize,
    pub relationship_types: Vec<String>,
    pub node_properties: Vec<String>,
    pub relationship_properties: Vec<String>,
}

impl ProjectionInfo {
    fn describe(name: &str, projection: &Projection) -> Self {
        let names = |kind: EntityKind| -> Vec<String> {
            projection
                .properties()
                .schema(kind)
                .into_iter()
                .map(|(name, _)| name)
                .collect()
        };
        Self {
            name: name.to_string(),
            node_count: projection.node_count(),
            relationship_count: projection.relationship_count(),
            relationship_types: projection.relationship_types().to_vec(),
            node_properties: names(EntityKind::Node),
            relationship_properties: names(EntityKind::Relationship),
        }
    }
}

/// Registry of named projections
#[derive(Debug, Clone, Default)]
pub struct ProjectionCatalog {
    projections: Arc<RwLock<HashMap<String, Arc<Projection>>>>,
}

impl ProjectionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a projection and register it under `name`
    pub fn project<N, R>(
        &self,
        name: &str,
        nodes: N,
        relationships: R,
        config: &ProjectionConfig,
    ) -> Result<Arc<Projection>>
    where
        N: IntoIterator,
        N::Item: Borrow<NodeRecord>,
        R: IntoIterator,
        R::Item: Borrow<RelationshipRecord>,
    {
        if self.exists(name) {
            return Err(GraphError::ProjectionExists(name.to_string()));
        }
        let projection = Projection::build(nodes, relationships, config)?;
        self.register(name, projection)
    }

    /// Register an already built projection (for example a transformation result)
    pub fn register(&self, name: &str, projection: Projection) -> Result<Arc<Projection>> {
        let mut projections = self.projections.write();
        if projections.contains_key(name) {
            return Err(GraphError::ProjectionExists(name.to_string()));
        }
        let handle = Arc::new(projection);
        projections.insert(name.to_string(), Arc::clone(&handle));
        info!(
            "Registered projection '{}' ({} nodes, {} relationships)",
            name,
            handle.node_count(),
            handle.relationship_count()
        );
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Projection>> {
        self.projections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::ProjectionNotFound(name.to_string()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.projections.read().contains_key(name)
    }

    /// Every entry, ordered by name
    pub fn list(&self) -> Vec<ProjectionInfo> {
        let projections = self.projections.read();
        let mut infos: Vec<ProjectionInfo> = projections
            .iter()
            .map(|(name, projection)| ProjectionInfo::describe(name, projection))
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Remove a projection. Fails while handles obtained from the catalog are alive.
    pub fn drop(&self, name: &str) -> Result<ProjectionInfo> {
        let mut projections = self.projections.write();
        let Some(projection) = projections.get(name) else {
            warn!("Attempted to drop non-existent projection: {}", name);
            return Err(GraphError::ProjectionNotFound(name.to_string()));
        };

        let handles = Arc::strong_count(projection) - 1;
        if handles > 0 {
            return Err(GraphError::ProjectionInUse {
                name: name.to_string(),
                handles,
            });
        }

        let info = ProjectionInfo::describe(name, projection);
        projections.remove(name);
        debug!("Dropped projection: {}", name);
        Ok(info)
    }

    pub fn len(&self) -> usize {
        self.projections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projections.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::config::RelationshipSpec;

    fn config() -> ProjectionConfig {
        ProjectionConfig::new().with_relationship("KNOWS", RelationshipSpec::default())
    }

    fn records() -> (Vec<NodeRecord>, Vec<RelationshipRecord>) {
        let nodes = vec![NodeRecord::new("a"), NodeRecord::new("b")];
        let rels = vec![RelationshipRecord::new("a", "b", "KNOWS")];
        (nodes, rels)
    }

    #[test]
    fn test_catalog_basic_operations() {
        let catalog = ProjectionCatalog::new();
        let (nodes, rels) = records();
        let config = config();

        catalog.project("g", &nodes, &rels, &config).unwrap();
        assert!(catalog.exists("g"));
        assert_eq!(catalog.len(), 1);

        let listed = catalog.list();
        assert_eq!(listed[0].name, "g");
        assert_eq!(listed[0].node_count, 2);
        assert_eq!(listed[0].relationship_types, vec!["KNOWS".to_string()]);

        assert!(matches!(
            catalog.project("g", &nodes, &rels, &config),
            Err(GraphError::ProjectionExists(_))
        ));

        let dropped = catalog.drop("g").unwrap();
        assert_eq!(dropped.relationship_count, 1);
        assert!(catalog.is_empty());
        assert!(matches!(catalog.get("g"), Err(GraphError::ProjectionNotFound(_))));
    }

    #[test]
    fn test_drop_refuses_live_handles() {
        let catalog = ProjectionCatalog::new();
        let (nodes, rels) = records();
        let handle = catalog.project("g", &nodes, &rels, &config()).unwrap();

        match catalog.drop("g") {
            Err(GraphError::ProjectionInUse { handles, .. }) => assert_eq!(handles, 1),
            other => panic!("expected ProjectionInUse, got {:?}", other),
        }

        drop(handle);
        assert!(catalog.drop("g").is_ok());
        assert!(matches!(catalog.drop("g"), Err(GraphError::ProjectionNotFound(_))));
    }
}
