// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attribute Sets
//!
//! This module defines [`AttributeSet`], the dictionary of named attribute
//! expressions that makes up one side of a capability surface, together with
//! the three operations the plan finder is built from:
//!
//! - [`AttributeSet::intersect`] — per-attribute intersection of two
//!   surfaces, carrying only attributes with a non-absent result
//! - [`AttributeSet::matches`] — the admissibility predicate between a
//!   declared surface and a concrete instance
//! - [`AttributeSet::best`] — collapse of an intersection to concrete
//!   per-step values, honoring source hints (never upscale, never convert
//!   format unnecessarily)
//!
//! ## Instances vs. surfaces
//!
//! The same dictionary type carries both roles. A manifest surface may use
//! any expression variant; an *instance* (a source descriptor, a requested
//! output instruction, a realized step payload) is expected to hold only
//! concrete singleton values. The match predicate rejects instances carrying
//! multi-valued expressions outright.

use super::attribute::{AttributeExpr, AttributeValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved attribute: MIME-like media type. Mandatory on graph edges.
pub const ATTR_TYPE: &str = "type";
/// Reserved attribute: pixel width of a raster rendition.
pub const ATTR_WIDTH: &str = "width";
/// Reserved attribute: pixel height of a raster rendition.
pub const ATTR_HEIGHT: &str = "height";
/// Reserved attribute: EXIF orientation merged from the metadata probe.
pub const ATTR_ORIENTATION: &str = "orientation";
/// Sentinel prefix marking a service-feature requirement on an input
/// surface. `feature:<name>` requires `<name>` to be truthy among the
/// instance's features.
pub const FEATURE_SENTINEL_PREFIX: &str = "feature:";

/// Feature flags advertised by an asset source or activation request.
pub type Features = HashMap<String, bool>;

/// A dictionary of named attribute expressions.
///
/// Used both for manifest surfaces (inputs/outputs) and for concrete
/// instances. Attribute absence means "any value accepted"; an attribute
/// mapped to an empty list means "supports nothing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(HashMap<String, AttributeExpr>);

impl AttributeSet {
    /// Creates an empty attribute set
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Inserts an expression under an attribute name
    pub fn insert(&mut self, name: impl Into<String>, expr: impl Into<AttributeExpr>) -> &mut Self {
        self.0.insert(name.into(), expr.into());
        self
    }

    /// Builder-style insertion
    pub fn with(mut self, name: impl Into<String>, expr: impl Into<AttributeExpr>) -> Self {
        self.insert(name, expr);
        self
    }

    /// Gets the expression for an attribute name
    pub fn get(&self, name: &str) -> Option<&AttributeExpr> {
        self.0.get(name)
    }

    /// Removes an attribute, returning its expression
    pub fn remove(&mut self, name: &str) -> Option<AttributeExpr> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeExpr)> {
        self.0.iter()
    }

    /// Gets the concrete media type, when present as a singleton string
    pub fn media_type(&self) -> Option<&str> {
        match self.0.get(ATTR_TYPE) {
            Some(AttributeExpr::Value(v)) => v.as_str(),
            _ => None,
        }
    }

    /// Gets a concrete numeric attribute, when present as a singleton number
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.0.get(name) {
            Some(AttributeExpr::Value(v)) => v.as_f64(),
            _ => None,
        }
    }

    /// Whether every attribute holds a concrete singleton value
    pub fn is_concrete(&self) -> bool {
        self.0.values().all(AttributeExpr::is_concrete)
    }

    /// Computes the per-attribute intersection of two surfaces.
    ///
    /// Attribute names present on only one side are skipped: absence means
    /// "anything", and the intersection carries only attributes constrained
    /// by both operands with a non-absent result.
    pub fn intersect(&self, other: &AttributeSet) -> AttributeSet {
        let mut result = AttributeSet::new();
        for (name, a_expr) in &self.0 {
            if let Some(b_expr) = other.0.get(name) {
                if let Some(common) = a_expr.intersect(b_expr) {
                    result.0.insert(name.clone(), common);
                }
            }
        }
        result
    }

    /// Tests whether a concrete instance is admissible under this surface.
    ///
    /// For every attribute present on the instance, the surface either omits
    /// the attribute or admits the instance's value. Instances carrying
    /// multi-valued expressions are rejected outright. Feature sentinel
    /// attributes on the surface (`feature:<name>`) additionally require the
    /// named flag to be truthy among `features`.
    pub fn matches(&self, instance: &AttributeSet, features: &Features) -> bool {
        // Instance values must be concrete.
        if !instance.is_concrete() {
            return false;
        }

        for (name, expr) in &instance.0 {
            let value = match expr {
                AttributeExpr::Value(v) => v,
                _ => unreachable!("checked by is_concrete"),
            };
            match self.0.get(name) {
                None => continue,
                Some(target_expr) => {
                    if !target_expr.admits(value) {
                        return false;
                    }
                }
            }
        }

        for (name, expr) in &self.0 {
            if let Some(feature) = name.strip_prefix(FEATURE_SENTINEL_PREFIX) {
                // A sentinel explicitly set to false requests nothing.
                if matches!(expr, AttributeExpr::Value(v) if !v.is_truthy()) {
                    continue;
                }
                if !features.get(feature).copied().unwrap_or(false) {
                    return false;
                }
            }
        }

        true
    }

    /// Collapses each attribute expression to a single concrete value.
    ///
    /// Priority lists collapse to their first element, ranges to their upper
    /// bound, singletons to themselves. Two post-rules apply against the
    /// source hints:
    ///
    /// - `width`/`height` are capped at the hint value: a rendition is never
    ///   upscaled past its source
    /// - `type` keeps the hint's media type whenever it is admissible under
    ///   the expression: the format is never converted unnecessarily
    ///
    /// Attributes whose collapsed value is not a concrete singleton are
    /// dropped.
    pub fn best(&self, source_hints: &AttributeSet) -> AttributeSet {
        let mut result = AttributeSet::new();
        for (name, expr) in &self.0 {
            let mut candidate = match expr.collapse() {
                Some(v) => v,
                None => continue,
            };

            if name == ATTR_WIDTH || name == ATTR_HEIGHT {
                if let (Some(value), Some(hint)) = (candidate.as_f64(), source_hints.number(name)) {
                    candidate = AttributeValue::Num(value.min(hint));
                }
            } else if name == ATTR_TYPE {
                if let Some(hint) = source_hints.media_type() {
                    let hinted = AttributeValue::from(hint);
                    if expr.admits(&hinted) {
                        candidate = hinted;
                    }
                }
            }

            result.0.insert(name.clone(), AttributeExpr::Value(candidate));
        }
        result
    }
}

impl FromIterator<(String, AttributeExpr)> for AttributeSet {
    fn from_iter<T: IntoIterator<Item = (String, AttributeExpr)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = (&'a String, &'a AttributeExpr);
    type IntoIter = std::collections::hash_map::Iter<'a, String, AttributeExpr>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_features() -> Features {
        Features::new()
    }

    fn concrete(pairs: &[(&str, AttributeValue)]) -> AttributeSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttributeExpr::Value(v.clone())))
            .collect()
    }

    #[test]
    fn test_intersect_skips_one_sided_attributes() {
        let a = AttributeSet::new()
            .with(ATTR_TYPE, AttributeExpr::list(["image/png", "image/jpeg"]))
            .with(ATTR_WIDTH, AttributeExpr::range(1.0, 2000.0));
        let b = AttributeSet::new()
            .with(ATTR_TYPE, AttributeExpr::list(["image/jpeg"]))
            .with("quality", AttributeExpr::range(1.0, 100.0));

        let common = a.intersect(&b);
        assert_eq!(common.len(), 1);
        assert_eq!(common.get(ATTR_TYPE), Some(&AttributeExpr::list(["image/jpeg"])));
    }

    #[test]
    fn test_intersect_drops_absent_results() {
        let a = AttributeSet::new().with(ATTR_TYPE, AttributeExpr::value("image/png"));
        let b = AttributeSet::new().with(ATTR_TYPE, AttributeExpr::value("video/mp4"));
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn test_matches_omitted_target_attribute_admits_anything() {
        let target = AttributeSet::new().with(ATTR_TYPE, AttributeExpr::list(["image/png"]));
        let instance = concrete(&[
            (ATTR_TYPE, AttributeValue::from("image/png")),
            (ATTR_WIDTH, AttributeValue::Num(5000.0)),
        ]);
        assert!(target.matches(&instance, &no_features()));
    }

    #[test]
    fn test_matches_rejects_inadmissible_value() {
        let target = AttributeSet::new().with(ATTR_TYPE, AttributeExpr::list(["image/png"]));
        let instance = concrete(&[(ATTR_TYPE, AttributeValue::from("image/tiff"))]);
        assert!(!target.matches(&instance, &no_features()));
    }

    #[test]
    fn test_matches_rejects_multi_valued_instance() {
        let target = AttributeSet::new();
        let instance = AttributeSet::new().with(ATTR_TYPE, AttributeExpr::list(["image/png", "image/jpeg"]));
        assert!(!target.matches(&instance, &no_features()));

        let ranged = AttributeSet::new().with(ATTR_WIDTH, AttributeExpr::range(1.0, 10.0));
        assert!(!target.matches(&ranged, &no_features()));
    }

    #[test]
    fn test_matches_feature_sentinel() {
        let target = AttributeSet::new()
            .with(ATTR_TYPE, AttributeExpr::list(["image/png"]))
            .with("feature:autoTag", AttributeExpr::value(true));
        let instance = concrete(&[(ATTR_TYPE, AttributeValue::from("image/png"))]);

        assert!(!target.matches(&instance, &no_features()));

        let mut features = Features::new();
        features.insert("autoTag".to_string(), true);
        assert!(target.matches(&instance, &features));

        features.insert("autoTag".to_string(), false);
        assert!(!target.matches(&instance, &features));
    }

    #[test]
    fn test_best_collapses_list_and_range() {
        let surface = AttributeSet::new()
            .with(ATTR_TYPE, AttributeExpr::list(["image/png", "image/jpeg"]))
            .with(ATTR_WIDTH, AttributeExpr::range(1.0, 319.0));
        let best = surface.best(&AttributeSet::new());
        assert_eq!(best.media_type(), Some("image/png"));
        assert_eq!(best.number(ATTR_WIDTH), Some(319.0));
    }

    #[test]
    fn test_best_never_upscales() {
        let surface = AttributeSet::new()
            .with(ATTR_WIDTH, AttributeExpr::range(1.0, 2000.0))
            .with(ATTR_HEIGHT, AttributeExpr::range(1.0, 2000.0));
        let hints = concrete(&[
            (ATTR_WIDTH, AttributeValue::Num(500.0)),
            (ATTR_HEIGHT, AttributeValue::Num(500.0)),
        ]);
        let best = surface.best(&hints);
        assert_eq!(best.number(ATTR_WIDTH), Some(500.0));
        assert_eq!(best.number(ATTR_HEIGHT), Some(500.0));
    }

    #[test]
    fn test_best_prefers_admissible_source_type() {
        let surface = AttributeSet::new().with(ATTR_TYPE, AttributeExpr::list(["image/png", "image/jpeg"]));
        let hints = concrete(&[(ATTR_TYPE, AttributeValue::from("image/jpeg"))]);
        assert_eq!(surface.best(&hints).media_type(), Some("image/jpeg"));

        // An inadmissible source type keeps the list head.
        let hints = concrete(&[(ATTR_TYPE, AttributeValue::from("image/tiff"))]);
        assert_eq!(surface.best(&hints).media_type(), Some("image/png"));
    }

    #[test]
    fn test_best_drops_empty_lists() {
        let surface = AttributeSet::new().with(ATTR_TYPE, AttributeExpr::List(vec![]));
        assert!(surface.best(&AttributeSet::new()).is_empty());
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    fn arb_value() -> impl Strategy<Value = AttributeValue> {
        prop_oneof![
            (0u32..50).prop_map(|n| AttributeValue::Num(n as f64)),
            "[a-z]{1,4}".prop_map(AttributeValue::Str),
            any::<bool>().prop_map(AttributeValue::Bool),
        ]
    }

    fn arb_expr() -> impl Strategy<Value = AttributeExpr> {
        prop_oneof![
            arb_value().prop_map(AttributeExpr::Value),
            prop::collection::vec(arb_value(), 1..5).prop_map(AttributeExpr::List),
            (0u32..50, 0u32..50).prop_map(|(a, b)| AttributeExpr::Range {
                min: a.min(b) as f64,
                max: a.max(b) as f64,
            }),
        ]
    }

    fn arb_set() -> impl Strategy<Value = AttributeSet> {
        prop::collection::hash_map("[a-e]", arb_expr(), 0..4)
            .prop_map(|m| m.into_iter().collect())
    }

    fn admitted_values(expr: &AttributeExpr, probe: &[AttributeValue]) -> Vec<AttributeValue> {
        probe.iter().filter(|v| expr.admits(v)).cloned().collect()
    }

    proptest! {
        /// Intersection is commutative in value content: the same concrete
        /// values are admitted by both orientations (ordering may differ).
        #[test]
        fn intersect_commutative_in_content(a in arb_expr(), b in arb_expr(), probe in prop::collection::vec(arb_value(), 0..20)) {
            let ab = a.intersect(&b);
            let ba = b.intersect(&a);
            prop_assert_eq!(ab.is_some(), ba.is_some());
            if let (Some(ab), Some(ba)) = (ab, ba) {
                let mut left = admitted_values(&ab, &probe);
                let mut right = admitted_values(&ba, &probe);
                let key = |v: &AttributeValue| format!("{:?}", v);
                left.sort_by_key(key);
                right.sort_by_key(key);
                prop_assert_eq!(left, right);
            }
        }

        /// A surface intersected with itself admits exactly what it admits.
        #[test]
        fn intersect_idempotent(set in arb_set()) {
            let twice = set.intersect(&set);
            prop_assert_eq!(twice, set);
        }
    }
}
