// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attribute Expressions
//!
//! This module defines the attribute value and expression value objects at
//! the bottom of the capability model. A transformer's manifest describes its
//! input and output surfaces as mappings from attribute name to *attribute
//! expression*; two surfaces are compared by intersecting their expressions
//! attribute by attribute.
//!
//! ## Overview
//!
//! An attribute expression is one of:
//!
//! - **Value**: a singleton scalar (string, number, or boolean)
//! - **List**: an ordered priority list of scalars; earlier entries are
//!   preferred when the expression is collapsed to a single value
//! - **Range**: a numeric `{min, max}` interval with inclusive bounds
//!
//! Absence is modeled by key absence in the containing
//! [`AttributeSet`](super::AttributeSet) and means "any value accepted". An
//! empty list means "supports nothing for this attribute".
//!
//! ## Intersection Algebra
//!
//! [`AttributeExpr::intersect`] computes the expression accepted by both
//! operands. The binary rules are symmetric in value content; where the
//! result is a list, its order follows the first operand:
//!
//! | A × B | Result |
//! |---|---|
//! | range × range | overlapping sub-range, or nothing |
//! | range × list | list entries falling inside the range |
//! | range × value | the value if inside the range |
//! | list × list | order-preserving intersection (first operand's order) |
//! | list × value | the value if present in the list |
//! | value × value | the value if equal |
//!
//! ## Serialization
//!
//! Both types serialize untagged, matching the manifest wire format: a bare
//! scalar is a `Value`, an array is a `List`, and an object with `min`/`max`
//! is a `Range`.

use serde::{Deserialize, Serialize};

/// A concrete attribute scalar.
///
/// Instances (sources, rendition instructions, realized step payloads) carry
/// only concrete scalars; expressions with multiple admissible values never
/// appear on an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl AttributeValue {
    /// Gets the numeric content, if this value is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Gets the string content, if this value is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness in the loose sense event and feature flags use:
    /// `false`, `0`, and `""` are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttributeValue::Bool(b) => *b,
            AttributeValue::Num(n) => *n != 0.0,
            AttributeValue::Str(s) => !s.is_empty(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Str(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Str(s)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        AttributeValue::Num(n)
    }
}

impl From<u32> for AttributeValue {
    fn from(n: u32) -> Self {
        AttributeValue::Num(n as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Num(n) => write!(f, "{}", n),
            AttributeValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// One attribute's declared surface: a singleton, an ordered priority list,
/// or an inclusive numeric range.
///
/// The variant order matters for untagged deserialization: an object with
/// `min`/`max` keys parses as a range, an array as a list, and anything else
/// as a scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeExpr {
    Range { min: f64, max: f64 },
    List(Vec<AttributeValue>),
    Value(AttributeValue),
}

impl AttributeExpr {
    /// Creates a singleton expression
    pub fn value(v: impl Into<AttributeValue>) -> Self {
        AttributeExpr::Value(v.into())
    }

    /// Creates an ordered priority list expression
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        AttributeExpr::List(values.into_iter().map(Into::into).collect())
    }

    /// Creates an inclusive numeric range expression
    pub fn range(min: f64, max: f64) -> Self {
        AttributeExpr::Range { min, max }
    }

    /// Whether this expression admits exactly one value
    pub fn is_concrete(&self) -> bool {
        matches!(self, AttributeExpr::Value(_))
    }

    /// Whether a concrete value is admissible under this expression
    pub fn admits(&self, value: &AttributeValue) -> bool {
        match self {
            AttributeExpr::Range { min, max } => value.as_f64().map(|n| n >= *min && n <= *max).unwrap_or(false),
            AttributeExpr::List(values) => values.contains(value),
            AttributeExpr::Value(v) => v == value,
        }
    }

    /// Computes the intersection of two expressions.
    ///
    /// Returns `None` when no value is accepted by both sides, which the
    /// caller treats as attribute absence. Where the result is a list, its
    /// order follows `self`.
    pub fn intersect(&self, other: &AttributeExpr) -> Option<AttributeExpr> {
        match (self, other) {
            (AttributeExpr::Range { min: a_min, max: a_max }, AttributeExpr::Range { min: b_min, max: b_max }) => {
                let min = a_min.max(*b_min);
                let max = a_max.min(*b_max);
                if min <= max {
                    Some(AttributeExpr::Range { min, max })
                } else {
                    None
                }
            }
            (range @ AttributeExpr::Range { .. }, AttributeExpr::List(values))
            | (AttributeExpr::List(values), range @ AttributeExpr::Range { .. }) => {
                let filtered: Vec<AttributeValue> = values.iter().filter(|v| range.admits(v)).cloned().collect();
                if filtered.is_empty() {
                    None
                } else {
                    Some(AttributeExpr::List(filtered))
                }
            }
            (range @ AttributeExpr::Range { .. }, AttributeExpr::Value(v))
            | (AttributeExpr::Value(v), range @ AttributeExpr::Range { .. }) => {
                if range.admits(v) {
                    Some(AttributeExpr::Value(v.clone()))
                } else {
                    None
                }
            }
            (AttributeExpr::List(a), AttributeExpr::List(b)) => {
                let common: Vec<AttributeValue> = a.iter().filter(|v| b.contains(v)).cloned().collect();
                if common.is_empty() {
                    None
                } else {
                    Some(AttributeExpr::List(common))
                }
            }
            (AttributeExpr::List(values), AttributeExpr::Value(v))
            | (AttributeExpr::Value(v), AttributeExpr::List(values)) => {
                if values.contains(v) {
                    Some(AttributeExpr::Value(v.clone()))
                } else {
                    None
                }
            }
            (AttributeExpr::Value(a), AttributeExpr::Value(b)) => {
                if a == b {
                    Some(AttributeExpr::Value(a.clone()))
                } else {
                    None
                }
            }
        }
    }

    /// Collapses the expression to its preferred single value.
    ///
    /// Priority lists collapse to their first element, ranges to their upper
    /// bound, singletons to themselves. An empty list collapses to nothing.
    pub fn collapse(&self) -> Option<AttributeValue> {
        match self {
            AttributeExpr::Value(v) => Some(v.clone()),
            AttributeExpr::List(values) => values.first().cloned(),
            AttributeExpr::Range { max, .. } => Some(AttributeValue::Num(*max)),
        }
    }
}

impl From<AttributeValue> for AttributeExpr {
    fn from(v: AttributeValue) -> Self {
        AttributeExpr::Value(v)
    }
}

impl From<&str> for AttributeExpr {
    fn from(s: &str) -> Self {
        AttributeExpr::Value(s.into())
    }
}

impl From<String> for AttributeExpr {
    fn from(s: String) -> Self {
        AttributeExpr::Value(s.into())
    }
}

impl From<f64> for AttributeExpr {
    fn from(n: f64) -> Self {
        AttributeExpr::Value(n.into())
    }
}

impl From<u32> for AttributeExpr {
    fn from(n: u32) -> Self {
        AttributeExpr::Value(n.into())
    }
}

impl From<bool> for AttributeExpr {
    fn from(b: bool) -> Self {
        AttributeExpr::Value(b.into())
    }
}
