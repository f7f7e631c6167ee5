//! Composition index building for layered scene description.
//!
//! This crate turns layers into the indices that answer "which opinions
//! contribute to this property, and what does it target":
//!
//! - [`MutedLayerSet`]: canonical identifiers of administratively muted layers.
//! - [`LayerStackRegistry`]: deduplicated, shared [`LayerStack`]s keyed by
//!   [`LayerStackIdentifier`], recomputed when the muted set changes.
//! - [`build_property_index`]: the strength-ordered specs of one property,
//!   with type consistency and permission enforcement.
//! - [`build_target_index`]: the composed targets or connections of one
//!   property, validated against the target prims' indices.
//!
//! Prim indices are supplied by the caller through a [`CompositionCache`];
//! [`PrimIndexGraph`] is the storage they are expressed in.
//!
//! Data inconsistencies are reported as [`CompositionError`] values pushed
//! onto caller-supplied vectors. Only misuse and I/O failures are `Err`.

/// TOML configuration.
pub mod config;
/// Error types.
pub mod error;
/// Prim index graphs and map functions.
pub mod graph;
/// Layer stacks and their relocation tables.
pub mod layer_stack;
/// Muted layer bookkeeping.
pub mod muted_layers;
/// Prim indices and caches.
pub mod prim_index;
/// Property spec gathering.
pub mod property_index;
/// The layer stack registry.
pub mod registry;
/// Asset path resolution.
pub mod resolver;
/// Target and connection composition.
pub mod target_index;

pub use config::CompositionConfig;
pub use error::{CompositionError, ConfigError, ConfigResult, RegistryError};
pub use graph::{ArcType, MapFunction, NodeId, NodeRef, PrimIndexGraph, Site};
pub use layer_stack::{LayerStack, LayerStackIdentifier, Relocates};
pub use muted_layers::{MuteOutcome, MutedLayerSet};
pub use prim_index::{CompositionCache, PrimIndex, PrimIndexCache};
pub use property_index::{
	GatherMode, PermissionState, PropertyIndex, PropertyInfo, build_property_index,
	gather_property_specs, gather_relational_attribute_specs,
};
pub use registry::LayerStackRegistry;
pub use resolver::{PathResolver, REPOSITORY_SCHEME, ResolverContext, SearchPathResolver};
pub use target_index::{
	SpecKind, TargetIndex, TargetIndexFilter, Translation, build_filtered_target_index,
	build_target_index,
};
