// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Record and property storage
//!
//! This module provides:
//! - Value type system for input records and projected properties
//! - Node and relationship input records
//! - Column-oriented property store with declared shapes and defaults

pub mod property_store;
pub mod types;
pub mod value;

pub use property_store::{EntityKind, PropertyColumn, PropertySchema, PropertyStore, PropertyStream};
pub use types::{NodeRecord, RelationshipRecord};
pub use value::{PropertyValue, Value, ValueType};
