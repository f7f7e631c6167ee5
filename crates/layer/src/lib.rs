//! Scene description layers.
//!
//! A [`Layer`] is a flat key-value store of specs keyed by [`Path`]. Layers are
//! shared through [`LayerRef`], whose equality is identity rather than content:
//! two layers with identical specs are still distinct layers.
//!
//! [`Path`]: lamina_primitives::Path

/// Asset path anchoring and identifier classification.
pub mod asset_path;
/// Identifier-keyed layer lookup for sublayer resolution.
pub mod catalog;
/// Layer storage and spec handles.
pub mod layer;
/// Typed field values.
pub mod value;

pub use asset_path::{compute_asset_path_relative_to_layer, is_anonymous_identifier, is_search_path};
pub use catalog::{LayerCatalog, LayerLoader};
pub use layer::{Layer, LayerError, LayerRef, SpecHandle};
pub use value::{FieldKey, FromFieldValue, Value};
