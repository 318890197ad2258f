// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Value type system for graph properties
//!
//! Two layers:
//! - [`Value`]: the loosely typed property values carried by input records
//! - [`PropertyValue`]: the shaped values held by a projection's property store,
//!   each described by a [`ValueType`]

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Property value as supplied by the external property graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    List(Vec<Value>),
    Vector(Vec<f64>), // Dedicated numeric vector, projects to a DoubleArray
    Null,
}

impl Value {
    /// Extract as number if possible (integers widen to f64)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Extract as string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extract as list if possible
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Number(_) => "Number",
            Value::Integer(_) => "Integer",
            Value::Boolean(_) => "Boolean",
            Value::List(_) => "List",
            Value::Vector(_) => "Vector",
            Value::Null => "Null",
        }
    }

    /// Convert into a property store value.
    ///
    /// Returns `Ok(None)` for null. Numbers become `Double`, vectors become
    /// `DoubleArray`, lists of integers become `LongArray`. Anything else
    /// cannot be projected.
    pub fn to_property_value(&self, property: &str) -> Result<Option<PropertyValue>> {
        match self {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(PropertyValue::Double(*n))),
            Value::Integer(i) => Ok(Some(PropertyValue::Double(*i as f64))),
            Value::Vector(v) => Ok(Some(PropertyValue::DoubleArray(v.clone()))),
            Value::List(items) => {
                let mut longs = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Integer(i) => longs.push(*i),
                        other => {
                            return Err(GraphError::TypeMismatch {
                                property: property.to_string(),
                                expected: "List<Integer>".to_string(),
                                actual: format!("List containing {}", other.type_name()),
                            })
                        }
                    }
                }
                Ok(Some(PropertyValue::LongArray(longs)))
            }
            other => Err(GraphError::TypeMismatch {
                property: property.to_string(),
                expected: "Number, Vector or List<Integer>".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Vector(vec) => {
                write!(f, "VECTOR[")?;
                for (i, item) in vec.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::List(v.into_iter().map(Value::Integer).collect())
    }
}

/// Declared shape of a stored property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Double,
    /// Fixed-length numeric vector of the given dimension
    DoubleArray(usize),
    /// Set-valued integer list, length may vary per entity
    LongArray,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Double => write!(f, "Double"),
            ValueType::DoubleArray(dim) => write!(f, "DoubleArray[{}]", dim),
            ValueType::LongArray => write!(f, "LongArray"),
        }
    }
}

/// Value held by a property store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Double(f64),
    DoubleArray(Vec<f64>),
    LongArray(Vec<i64>),
}

impl PropertyValue {
    /// Shape of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Double(_) => ValueType::Double,
            PropertyValue::DoubleArray(v) => ValueType::DoubleArray(v.len()),
            PropertyValue::LongArray(_) => ValueType::LongArray,
        }
    }

    /// Extract as scalar if possible
    pub fn as_double(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Extract as numeric vector if possible
    pub fn as_double_array(&self) -> Option<&[f64]> {
        match self {
            PropertyValue::DoubleArray(v) => Some(v),
            _ => None,
        }
    }

    /// Extract as integer list if possible
    pub fn as_long_array(&self) -> Option<&[i64]> {
        match self {
            PropertyValue::LongArray(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(d: f64) -> Self {
        PropertyValue::Double(d)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(v: Vec<f64>) -> Self {
        PropertyValue::DoubleArray(v)
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(v: Vec<i64>) -> Self {
        PropertyValue::LongArray(v)
    }
}
