//! # Rendition Pipeline Domain
//!
//! The domain layer of the rendition pipeline: the pure business logic that
//! turns a source asset and a set of output instructions into an executable
//! chain of transformer steps. It is completely independent of external
//! concerns — no filesystem, no network, no process spawning — and is
//! consumed by the engine crate, which supplies all of those behind ports.
//!
//! ## Module Structure
//!
//! - [`value_objects`] — the attribute algebra (values, expressions,
//!   intersection, matching, best-value collapse), media-type validation,
//!   and the timer value object
//! - [`entities`] — capability manifests, the refinable [`Plan`] with its
//!   state machine and structural serialization, asset descriptors and
//!   renditions, and the activation metrics aggregate
//! - [`services`] — the [`Transformer`] contract and registry, the
//!   capability graph, the breadth-first [`PlanFinder`], and the async ports
//!   for injected collaborators (events, metrics, transfer, temporary cloud
//!   storage, metadata probing)
//! - [`events`] — rendition outcome events and their redaction rules
//! - [`error`] — the [`RenditionError`] taxonomy with stable reason codes
//!
//! ## Core Concepts
//!
//! ### Capability Surfaces
//! A transformer declares what it accepts and produces as attribute
//! expressions (singleton, priority list, or inclusive range). Two
//! transformers chain when the intersection of one's outputs with the
//! other's inputs constrains the mandatory `type` attribute.
//!
//! ### Plans
//! A plan is a refinable linked sequence of steps with a position cursor and
//! a state machine (`initial → inProgress → succeeded | failed`). Steps
//! inserted while the cursor rests on a step nest as that step's group,
//! which the structural JSON serialization preserves.
//!
//! ### Never Upscale, Never Convert Needlessly
//! Realized intermediate outputs are collapsed against the incoming
//! attributes: dimensions are capped at the source's, and the source's media
//! type is kept whenever the chain admits it.

pub mod entities;
pub mod error;
pub mod events;
pub mod services;
pub mod value_objects;

pub use entities::{
    ActivationMetrics, AssetDescriptor, Manifest, Plan, PlanState, Rendition, Source, SourceType, Step,
    StepAttributes, UploadTarget,
};
pub use error::{ErrorReason, RenditionError};
pub use events::RenditionEvent;
pub use services::{
    AssetMetadata, EventSink, MetadataProbe, MetricsSink, PlanFinder, PlannedStep, PresignedHandle,
    TemporaryCloudStorage, Transformer, TransformerContext, TransformerGraph, TransformerRegistry, TransferPolicy,
    TransferService,
};
pub use value_objects::{AttributeExpr, AttributeSet, AttributeValue, Features};
