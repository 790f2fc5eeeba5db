// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transformer Capability Graph
//!
//! A directed multigraph over the registered transformers: an edge A→B
//! exists iff the intersection of A's output surface with B's input surface
//! is non-empty and constrains the mandatory `type` attribute. Each edge
//! stores its intersection so plan realization can collapse it to concrete
//! per-step values without recomputing.
//!
//! The graph is built once per plan-finder instance, lazily on first use,
//! from a snapshot of the registry. Cycles are expected (a png→png resizer
//! is a self-loop candidate, though self-edges are excluded as A and B must
//! be distinct); the finder's visited set keeps traversal finite.
//!
//! Adjacency lists are kept in sorted name order so breadth-first discovery
//! order, and therefore tie-breaking between equal-length plans, is
//! deterministic across runs.

use crate::services::transformer::TransformerRegistry;
use crate::value_objects::{AttributeSet, ATTR_TYPE};
use std::collections::HashMap;

/// Directed capability graph with edge intersections.
#[derive(Debug, Default)]
pub struct TransformerGraph {
    /// node → successors, sorted by name
    adjacency: HashMap<String, Vec<String>>,
    /// (from, to) → intersection of from.outputs with to.inputs
    edges: HashMap<(String, String), AttributeSet>,
}

impl TransformerGraph {
    /// Builds the graph from a registry snapshot.
    ///
    /// Every ordered pair of distinct transformers is probed; pairs whose
    /// surface intersection lacks a `type` attribute produce no edge.
    pub fn build(registry: &TransformerRegistry) -> Self {
        let mut names: Vec<&str> = registry.names();
        names.sort_unstable();

        let mut graph = TransformerGraph::default();
        for &from in &names {
            let from_manifest = registry.get(from).expect("name from registry").manifest();
            let mut successors = Vec::new();
            for &to in &names {
                if from == to {
                    continue;
                }
                let to_manifest = registry.get(to).expect("name from registry").manifest();
                let intersection = from_manifest.outputs.intersect(&to_manifest.inputs);
                if intersection.contains(ATTR_TYPE) {
                    successors.push(to.to_string());
                    graph.edges.insert((from.to_string(), to.to_string()), intersection);
                }
            }
            graph.adjacency.insert(from.to_string(), successors);
        }
        graph
    }

    /// Successor names of a node, in sorted order
    pub fn adjacent(&self, name: &str) -> &[String] {
        self.adjacency.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The stored intersection on edge `from`→`to`, when the edge exists
    pub fn intersection(&self, from: &str, to: &str) -> Option<&AttributeSet> {
        self.edges.get(&(from.to_string(), to.to_string()))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
