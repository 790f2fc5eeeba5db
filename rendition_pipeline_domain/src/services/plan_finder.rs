// /////////////////////////////////////////////////////////////////////////////
// Rendition Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Plan Finder
//!
//! Given a source descriptor and the caller's output instructions, the plan
//! finder selects a minimal chain of transformers whose capability surfaces
//! reach from source to target, then realizes concrete per-step attribute
//! values that are consistent across the chain.
//!
//! ## Search
//!
//! Breadth-first over the [capability graph](super::TransformerGraph),
//! seeded with every transformer whose input surface admits the source.
//! Each dequeued partial chain counts against a hard visit bound; the first
//! chain whose tail output surface admits the requested instructions wins,
//! which under BFS is also the shortest (ties resolved by discovery order).
//! The visited set makes cyclic capability graphs finite to traverse.
//!
//! ## Realization
//!
//! The chosen chain is turned into concrete steps:
//!
//! - the first input is a deep copy of the source
//! - every intermediate output is the [`best`](crate::value_objects::AttributeSet::best)
//!   collapse of the edge intersection against that step's input, so
//!   renditions are never upscaled and formats never converted without need
//! - dimensions pass through unchanged when an intermediate output leaves
//!   them unconstrained
//! - the caller's `userData` is carried onto every step's output
//! - each next input is the previous output minus `userData`
//! - the final output is the caller's instructions, verbatim
//! - a transformer declaring `sourceType` gets it stamped onto its input
//!
//! ## Orientation Normalization
//!
//! A single-step plan whose sole transformer consumes asset metadata gets an
//! orientation-normalizing transformer prepended when the probed source
//! carries a non-trivial EXIF orientation, so tagging services see upright
//! pixels.

use crate::entities::{AssetDescriptor, StepAttributes};
use crate::services::transformer::{TransformerRegistry, ORIENTATION_NORMALIZER_PREFIX};
use crate::services::transformer_graph::TransformerGraph;
use crate::value_objects::{media_type, ATTR_HEIGHT, ATTR_TYPE, ATTR_WIDTH};
use crate::RenditionError;
use once_cell::sync::OnceCell;
use std::collections::{HashSet, VecDeque};

/// Hard bound on breadth-first visits per search.
pub const MAX_EXPANSIONS: usize = 300;

/// One realized step of a discovered plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep {
    pub name: String,
    pub attributes: StepAttributes,
}

/// Breadth-first plan finder over a transformer registry.
///
/// The capability graph is built lazily on first use and reused for the
/// lifetime of the finder.
pub struct PlanFinder<'a> {
    registry: &'a TransformerRegistry,
    graph: OnceCell<TransformerGraph>,
}

impl<'a> PlanFinder<'a> {
    pub fn new(registry: &'a TransformerRegistry) -> Self {
        Self {
            registry,
            graph: OnceCell::new(),
        }
    }

    fn graph(&self) -> &TransformerGraph {
        self.graph.get_or_init(|| TransformerGraph::build(self.registry))
    }

    /// Finds and realizes the shortest transformer chain from `source` to
    /// `output`.
    ///
    /// # Errors
    ///
    /// * `SourceCorrupt` - the source media type is missing or malformed
    /// * `RenditionFormatUnsupported` - the requested type is malformed, no
    ///   transformer accepts the source, or no chain reaches the target
    ///   within the visit bound
    pub fn find(
        &self,
        source: &AssetDescriptor,
        output: &AssetDescriptor,
    ) -> Result<Vec<PlannedStep>, RenditionError> {
        let source_type = source
            .media_type()
            .filter(|t| media_type::is_well_formed(t))
            .ok_or_else(|| {
                RenditionError::source_corrupt(format!(
                    "Source type '{}' is not a well-formed media type",
                    source.media_type().unwrap_or("")
                ))
            })?;

        let requested_type = output
            .media_type()
            .filter(|t| media_type::is_well_formed(t))
            .ok_or_else(|| {
                RenditionError::RenditionFormatUnsupported(format!(
                    "Requested type '{}' is not a well-formed media type",
                    output.media_type().unwrap_or("")
                ))
            })?;

        let chain = self.search(source, output, source_type, requested_type)?;
        let mut steps = self.realize(&chain, source, output);
        self.prepend_orientation_normalization(&mut steps, source);
        Ok(steps)
    }

    /// Bounded breadth-first search for the shortest capability chain.
    fn search(
        &self,
        source: &AssetDescriptor,
        output: &AssetDescriptor,
        source_type: &str,
        requested_type: &str,
    ) -> Result<Vec<String>, RenditionError> {
        // Seed with every transformer that accepts the source directly.
        let mut seed_names: Vec<&str> = self
            .registry
            .iter()
            .filter(|(_, t)| t.manifest().inputs.matches(&source.attributes, &source.features))
            .map(|(name, _)| name.as_str())
            .collect();
        seed_names.sort_unstable();

        if seed_names.is_empty() {
            return Err(RenditionError::RenditionFormatUnsupported(format!(
                "No transformer accepts source type '{}'",
                source_type
            )));
        }

        let graph = self.graph();
        let mut queue: VecDeque<Vec<String>> = seed_names
            .into_iter()
            .map(|name| vec![name.to_string()])
            .collect();
        let mut visited: HashSet<String> = HashSet::new();
        let mut visits = 0usize;

        while let Some(chain) = queue.pop_front() {
            if visits >= MAX_EXPANSIONS {
                return Err(RenditionError::RenditionFormatUnsupported(format!(
                    "No plan from '{}' to '{}' within {} expansions",
                    source_type, requested_type, MAX_EXPANSIONS
                )));
            }
            visits += 1;

            let tail = chain.last().expect("chains are never empty");
            let tail_manifest = self.registry.get(tail).expect("planned name is registered").manifest();
            if tail_manifest.outputs.matches(&output.attributes, &output.features) {
                return Ok(chain);
            }

            if visited.insert(tail.clone()) {
                for successor in graph.adjacent(tail) {
                    let mut extended = chain.clone();
                    extended.push(successor.clone());
                    queue.push_back(extended);
                }
            }
        }

        Err(RenditionError::RenditionFormatUnsupported(format!(
            "No transformer chain produces '{}' from '{}'",
            requested_type, source_type
        )))
    }

    /// Resolves concrete per-step attribute values along the chosen chain.
    fn realize(&self, chain: &[String], source: &AssetDescriptor, requested: &AssetDescriptor) -> Vec<PlannedStep> {
        let graph = self.graph();
        let mut steps = Vec::with_capacity(chain.len());
        let mut input = source.clone();

        for (i, name) in chain.iter().enumerate() {
            let manifest = self.registry.get(name).expect("planned name is registered").manifest();
            if let Some(source_type) = manifest.declared_source_type() {
                input.source_type = Some(source_type);
            }

            let output = if i + 1 < chain.len() {
                let edge = graph
                    .intersection(name, &chain[i + 1])
                    .expect("consecutive planned steps share an edge");
                let mut intermediate = AssetDescriptor {
                    attributes: edge.best(&input.attributes),
                    ..AssetDescriptor::default()
                };
                // Dimension pass-through: an unconstrained intermediate
                // keeps the incoming dimensions.
                for dimension in [ATTR_WIDTH, ATTR_HEIGHT] {
                    if intermediate.attributes.number(dimension).is_none() {
                        if let Some(value) = input.attributes.number(dimension) {
                            intermediate.attributes.insert(dimension, value);
                        }
                    }
                }
                intermediate.user_data = requested.user_data.clone();
                intermediate
            } else {
                requested.clone()
            };

            steps.push(PlannedStep {
                name: name.clone(),
                attributes: StepAttributes {
                    input: input.clone(),
                    output: output.clone(),
                },
            });

            input = output;
            input.user_data = None;
        }

        steps
    }

    /// Prepends orientation normalization ahead of a lone metadata-consuming
    /// service step, when the probed source warrants it.
    fn prepend_orientation_normalization(&self, steps: &mut Vec<PlannedStep>, source: &AssetDescriptor) {
        if steps.len() != 1 || !source.has_nontrivial_orientation() {
            return;
        }
        let is_service = self
            .registry
            .get(&steps[0].name)
            .map(|t| t.consumes_metadata())
            .unwrap_or(false);
        if !is_service {
            return;
        }
        let normalizer = match self.registry.find_by_prefix(ORIENTATION_NORMALIZER_PREFIX) {
            Some(t) => t,
            None => return,
        };
        let source_type = match source.media_type() {
            Some(t) => t,
            None => return,
        };

        let mut output = AssetDescriptor::default();
        output.attributes.insert(ATTR_TYPE, source_type.to_string());
        steps.insert(
            0,
            PlannedStep {
                name: normalizer.name().to_string(),
                attributes: StepAttributes {
                    input: source.clone(),
                    output,
                },
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Manifest, Rendition};
    use crate::services::transformer::{Transformer, TransformerContext};
    use crate::value_objects::{AttributeExpr, ATTR_ORIENTATION};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Probe {
        name: String,
        manifest: Manifest,
        service: bool,
    }

    #[async_trait]
    impl Transformer for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn manifest(&self) -> &Manifest {
            &self.manifest
        }

        fn consumes_metadata(&self) -> bool {
            self.service
        }

        async fn compute(
            &self,
            _input: &AssetDescriptor,
            _output: &mut Rendition,
            _ctx: &TransformerContext,
        ) -> Result<(), RenditionError> {
            Ok(())
        }
    }

    fn chain_transformer(name: &str, input: &str, output: &str) -> Arc<dyn Transformer> {
        Arc::new(Probe {
            name: name.to_string(),
            manifest: Manifest::default()
                .with_input_types([input])
                .with_output_types([output]),
            service: false,
        })
    }

    /// Registry T1(1→2), T2(2→3), T3(3→4), T4(2→3) from numbered media
    /// types; types use an "app/" prefix to stay well-formed.
    fn numbered(n: u32) -> String {
        format!("app/t{}", n)
    }

    fn diamond_registry() -> TransformerRegistry {
        let mut registry = TransformerRegistry::new();
        registry.register(chain_transformer("t1", &numbered(1), &numbered(2)));
        registry.register(chain_transformer("t2", &numbered(2), &numbered(3)));
        registry.register(chain_transformer("t3", &numbered(3), &numbered(4)));
        registry.register(chain_transformer("t4", &numbered(2), &numbered(3)));
        registry
    }

    fn find_names(registry: &TransformerRegistry, from: &str, to: &str) -> Result<Vec<String>, RenditionError> {
        let finder = PlanFinder::new(registry);
        let steps = finder.find(&AssetDescriptor::of_type(from), &AssetDescriptor::of_type(to))?;
        Ok(steps.into_iter().map(|s| s.name).collect())
    }

    #[test]
    fn test_three_step_chain() {
        let registry = diamond_registry();
        assert_eq!(
            find_names(&registry, &numbered(1), &numbered(4)).unwrap(),
            vec!["t1", "t2", "t3"]
        );
    }

    #[test]
    fn test_single_step_plan() {
        let registry = diamond_registry();
        assert_eq!(find_names(&registry, &numbered(1), &numbered(2)).unwrap(), vec!["t1"]);
    }

    #[test]
    fn test_two_step_plan() {
        let registry = diamond_registry();
        let names = find_names(&registry, &numbered(1), &numbered(3)).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[0], "t1");
    }

    #[test]
    fn test_unreachable_target_fails() {
        let registry = diamond_registry();
        let err = find_names(&registry, &numbered(1), "app/t99").unwrap_err();
        assert!(matches!(err, RenditionError::RenditionFormatUnsupported(_)));
    }

    #[test]
    fn test_no_seed_fails() {
        let registry = diamond_registry();
        let err = find_names(&registry, "app/t99", &numbered(2)).unwrap_err();
        assert!(matches!(err, RenditionError::RenditionFormatUnsupported(_)));
    }

    #[test]
    fn test_malformed_source_type_is_corrupt() {
        let registry = diamond_registry();
        let err = find_names(&registry, "not a type", &numbered(2)).unwrap_err();
        assert!(matches!(err, RenditionError::SourceCorrupt(_)));
    }

    #[test]
    fn test_malformed_requested_type_is_unsupported() {
        let registry = diamond_registry();
        let err = find_names(&registry, &numbered(1), "bad/type/extra").unwrap_err();
        assert!(matches!(err, RenditionError::RenditionFormatUnsupported(_)));
    }

    #[test]
    fn test_short_route_beats_long_route() {
        let mut registry = TransformerRegistry::new();
        // Long route a→b→c, short route direct.
        registry.register(chain_transformer("long1", "app/a", "app/b"));
        registry.register(chain_transformer("long2", "app/b", "app/c"));
        registry.register(chain_transformer("direct", "app/a", "app/c"));

        assert_eq!(find_names(&registry, "app/a", "app/c").unwrap(), vec!["direct"]);
    }

    #[test]
    fn test_self_loops_terminate() {
        let mut registry = TransformerRegistry::new();
        registry.register(chain_transformer("ping", "app/a", "app/b"));
        registry.register(chain_transformer("pong", "app/b", "app/a"));

        let err = find_names(&registry, "app/a", "app/z").unwrap_err();
        assert!(matches!(err, RenditionError::RenditionFormatUnsupported(_)));
    }

    #[test]
    fn test_hundred_step_chain_realizes_midpoint() {
        let mut registry = TransformerRegistry::new();
        for i in 0..100 {
            registry.register(chain_transformer(&format!("c{:03}", i), &numbered(i), &numbered(i + 1)));
        }

        let finder = PlanFinder::new(&registry);
        let steps = finder
            .find(&AssetDescriptor::of_type(numbered(0)), &AssetDescriptor::of_type(numbered(100)))
            .unwrap();
        assert_eq!(steps.len(), 100);
        assert_eq!(steps[50].name, "c050");
        assert_eq!(steps[50].attributes.input.media_type(), Some(numbered(50).as_str()));
        assert_eq!(steps[50].attributes.output.media_type(), Some(numbered(51).as_str()));
    }

    #[test]
    fn test_expansion_bound() {
        let mut registry = TransformerRegistry::new();
        for i in 0..302 {
            registry.register(chain_transformer(&format!("c{:03}", i), &numbered(i), &numbered(i + 1)));
        }

        // 300 visits exactly reach target 300.
        let ok = find_names(&registry, &numbered(0), &numbered(300)).unwrap();
        assert_eq!(ok.len(), 300);

        // Target 301 needs one visit too many.
        let err = find_names(&registry, &numbered(0), &numbered(301)).unwrap_err();
        assert!(matches!(err, RenditionError::RenditionFormatUnsupported(_)));
    }

    #[test]
    fn test_realization_threads_outputs_into_inputs() {
        let mut registry = TransformerRegistry::new();
        registry.register(chain_transformer("png", "image/tiff", "image/png"));
        registry.register(chain_transformer("gif", "image/png", "image/gif"));

        let finder = PlanFinder::new(&registry);
        let steps = finder
            .find(
                &AssetDescriptor::of_type("image/tiff"),
                &AssetDescriptor::of_type("image/gif"),
            )
            .unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].attributes.output.media_type(), Some("image/png"));
        assert_eq!(steps[1].attributes.input.media_type(), Some("image/png"));
        assert_eq!(steps[1].attributes.output.media_type(), Some("image/gif"));
    }

    #[test]
    fn test_realization_caps_dimensions_and_keeps_format() {
        let mut registry = TransformerRegistry::new();

        let mut image_manifest = Manifest::default()
            .with_input_types(["image/png", "image/jpeg", "image/tiff", "image/gif"])
            .with_output_types(["image/png", "image/jpeg"]);
        image_manifest.outputs.insert("width", AttributeExpr::range(1.0, 2000.0));
        image_manifest.outputs.insert("height", AttributeExpr::range(1.0, 2000.0));
        registry.register(Arc::new(Probe {
            name: "image".to_string(),
            manifest: image_manifest,
            service: false,
        }));

        let mut service_manifest = Manifest::default()
            .with_input_types(["image/png", "image/jpeg"])
            .with_output_types(["machine-json"]);
        service_manifest.inputs.insert("width", AttributeExpr::range(1.0, 319.0));
        service_manifest.inputs.insert("height", AttributeExpr::range(1.0, 319.0));
        registry.register(Arc::new(Probe {
            name: "service".to_string(),
            manifest: service_manifest,
            service: true,
        }));

        let source = AssetDescriptor::of_type("image/jpeg")
            .with_attribute("width", 500.0)
            .with_attribute("height", 500.0);
        let finder = PlanFinder::new(&registry);
        let steps = finder.find(&source, &AssetDescriptor::of_type("machine-json")).unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].name, "image");
        let intermediate = &steps[0].attributes.output;
        assert_eq!(intermediate.media_type(), Some("image/jpeg"));
        assert_eq!(intermediate.width(), Some(319.0));
        assert_eq!(intermediate.height(), Some(319.0));

        // A small source skips the image step entirely.
        let small = AssetDescriptor::of_type("image/jpeg")
            .with_attribute("width", 200.0)
            .with_attribute("height", 200.0);
        let steps = finder.find(&small, &AssetDescriptor::of_type("machine-json")).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].name, "service");
    }

    #[test]
    fn test_orientation_normalization_prepends_for_lone_service() {
        let mut registry = TransformerRegistry::new();
        registry.register(Arc::new(Probe {
            name: "service".to_string(),
            manifest: Manifest::default()
                .with_input_types(["image/jpeg"])
                .with_output_types(["machine-json"]),
            service: true,
        }));
        registry.register(chain_transformer(
            "normalize-orientation-cb",
            "image/jpeg",
            "image/jpeg",
        ));

        let source = AssetDescriptor::of_type("image/jpeg").with_attribute(ATTR_ORIENTATION, 6.0);
        let finder = PlanFinder::new(&registry);
        let steps = finder.find(&source, &AssetDescriptor::of_type("machine-json")).unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].name, "normalize-orientation-cb");
        assert_eq!(steps[0].attributes.output.media_type(), Some("image/jpeg"));
        assert!(steps[0].attributes.output.width().is_none());
        assert_eq!(steps[1].name, "service");

        // Upright sources are left alone.
        let upright = AssetDescriptor::of_type("image/jpeg").with_attribute(ATTR_ORIENTATION, 1.0);
        let steps = finder.find(&upright, &AssetDescriptor::of_type("machine-json")).unwrap();
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_user_data_carried_onto_every_output() {
        let mut registry = TransformerRegistry::new();
        registry.register(chain_transformer("png", "image/tiff", "image/png"));
        registry.register(chain_transformer("gif", "image/png", "image/gif"));

        let requested = {
            let mut d = AssetDescriptor::of_type("image/gif");
            d.user_data = Some(serde_json::json!({ "uploadToken": "tok" }));
            d
        };
        let finder = PlanFinder::new(&registry);
        let steps = finder.find(&AssetDescriptor::of_type("image/tiff"), &requested).unwrap();

        for step in &steps {
            assert!(step.attributes.output.user_data.is_some(), "step {}", step.name);
        }
        // The threaded input drops user data.
        assert!(steps[1].attributes.input.user_data.is_none());
    }
}
