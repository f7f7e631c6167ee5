//! Error types for composition.
//!
//! [`CompositionError`] values describe inconsistencies in authored data. They
//! are accumulated into caller-supplied vectors and never abort a computation.
//! [`RegistryError`] and [`ConfigError`] are caller mistakes and I/O failures,
//! returned through `Result`.

use std::path::PathBuf;
use std::sync::Arc;

use lamina_layer::SpecHandle;
use lamina_primitives::{Path, SpecType, Variability};
use thiserror::Error;

use crate::layer_stack::LayerStackIdentifier;

/// An inconsistency found while composing authored data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
	/// A property spec has a different spec type than the canonical one.
	#[error("{conflicting} is a {conflicting_type}, but {canonical} is a {canonical_type}")]
	InconsistentPropertyType {
		/// The spec that fixed the canonical type.
		canonical: SpecHandle,
		canonical_type: SpecType,
		/// The rejected spec.
		conflicting: SpecHandle,
		conflicting_type: SpecType,
	},

	/// An attribute spec declares a different value type than the canonical one.
	#[error("{conflicting} has value type {conflicting_type}, but {canonical} has {canonical_type}")]
	InconsistentAttributeType {
		canonical: SpecHandle,
		canonical_type: Arc<str>,
		/// The rejected spec.
		conflicting: SpecHandle,
		conflicting_type: Arc<str>,
	},

	/// An attribute spec declares a different variability. The spec is still used.
	#[error("{conflicting} is {conflicting_variability}, but {canonical} is {canonical_variability}")]
	InconsistentAttributeVariability {
		canonical: SpecHandle,
		canonical_variability: Variability,
		conflicting: SpecHandle,
		conflicting_variability: Variability,
	},

	/// A spec lies beneath a private opinion and was ignored.
	#[error("{spec} is beneath a private opinion for {property}")]
	PropertyPermissionDenied {
		/// The composed property path.
		property: Path,
		/// The ignored spec.
		spec: SpecHandle,
	},

	/// A target path cannot be mapped into the root namespace.
	#[error("target {target} authored in {spec} is outside the namespace of its arc")]
	InvalidExternalTargetPath {
		/// The composed property path.
		property: Path,
		/// The target as authored, in the node's namespace.
		target: Path,
		/// The spec that authored the target.
		spec: SpecHandle,
	},

	/// A target points at an instance of the class that authored it.
	#[error("target {target} authored in {spec} points to an instance of its own class")]
	InvalidInstanceTargetPath {
		property: Path,
		/// The composed target path.
		target: Path,
		spec: SpecHandle,
	},

	/// A target points at a private or restricted opinion.
	#[error("target {target} authored in {spec} points to a private opinion")]
	TargetPermissionDenied {
		property: Path,
		target: Path,
		spec: SpecHandle,
	},

	/// A target crosses a relocation and is unreachable from the authoring site.
	#[error("target {target} authored in {spec} is not reachable through relocations")]
	InvalidTargetPath {
		property: Path,
		target: Path,
		spec: SpecHandle,
	},

	/// A layer lists a sublayer that is already being composed above it.
	#[error("sublayer @{sublayer}@ of @{layer}@ forms a cycle")]
	SublayerCycle {
		/// Identifier of the layer listing the sublayer.
		layer: String,
		/// Resolved identifier of the sublayer.
		sublayer: String,
	},

	/// A sublayer could not be opened.
	#[error("cannot open sublayer @{asset_path}@ of @{layer}@")]
	InvalidSublayerPath {
		layer: String,
		/// The sublayer path as authored.
		asset_path: String,
	},
}

impl CompositionError {
	/// Returns the composed property path the error belongs to, if any.
	pub fn property(&self) -> Option<&Path> {
		match self {
			Self::PropertyPermissionDenied { property, .. }
			| Self::InvalidExternalTargetPath { property, .. }
			| Self::InvalidInstanceTargetPath { property, .. }
			| Self::TargetPermissionDenied { property, .. }
			| Self::InvalidTargetPath { property, .. } => Some(property),
			_ => None,
		}
	}

	/// Returns the target path a target error is keyed by.
	///
	/// External target errors carry the path as authored; the others carry
	/// the composed path.
	pub fn target(&self) -> Option<&Path> {
		match self {
			Self::InvalidExternalTargetPath { target, .. }
			| Self::InvalidInstanceTargetPath { target, .. }
			| Self::TargetPermissionDenied { target, .. }
			| Self::InvalidTargetPath { target, .. } => Some(target),
			_ => None,
		}
	}
}

/// Misuse of the layer stack registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// The identifier has no root layer.
	#[error("invalid layer stack identifier: {0:?}")]
	InvalidIdentifier(LayerStackIdentifier),
	/// The stack is not live in this registry.
	#[error("layer stack {0:?} is not registered")]
	NotRegistered(LayerStackIdentifier),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or schema.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A search path entry is empty.
	#[error("empty entry in search_paths")]
	EmptySearchPath,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
