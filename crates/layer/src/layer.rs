use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lamina_primitives::{ListOp, Path, Permission, SpecType, Variability};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::asset_path::ANONYMOUS_PREFIX;
use crate::value::{FieldKey, FromFieldValue, Value};

static NEXT_ANONYMOUS_ID: AtomicU64 = AtomicU64::new(0);

/// Errors raised while authoring a layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
	/// A field was set on a path that has no spec.
	#[error("no spec at {path} in @{layer}@")]
	NoSpec {
		/// Identifier of the layer.
		layer: String,
		/// The path without a spec.
		path: Path,
	},
	/// The path cannot hold a spec of the requested type.
	#[error("cannot create {spec_type} spec at {path}")]
	InvalidSpecPath {
		/// The rejected path.
		path: Path,
		/// The requested spec type.
		spec_type: SpecType,
	},
}

#[derive(Debug, Clone)]
struct SpecData {
	spec_type: SpecType,
	fields: FxHashMap<FieldKey, Value>,
}

impl SpecData {
	fn new(spec_type: SpecType) -> Self {
		Self {
			spec_type,
			fields: FxHashMap::default(),
		}
	}
}

/// A flat store of specs keyed by path.
///
/// Every layer holds a pseudo-root spec at `/`, which carries layer metadata
/// such as sublayers and relocates.
pub struct Layer {
	identifier: String,
	specs: RwLock<FxHashMap<Path, SpecData>>,
}

impl Layer {
	/// Creates an empty layer with the given identifier.
	pub fn new(identifier: impl Into<String>) -> LayerRef {
		let mut specs = FxHashMap::default();
		specs.insert(Path::absolute_root(), SpecData::new(SpecType::PseudoRoot));
		LayerRef(Arc::new(Self {
			identifier: identifier.into(),
			specs: RwLock::new(specs),
		}))
	}

	/// Creates an empty anonymous layer; `tag` is kept in the identifier for debugging.
	pub fn anonymous(tag: &str) -> LayerRef {
		let id = NEXT_ANONYMOUS_ID.fetch_add(1, Ordering::Relaxed);
		Self::new(format!("{ANONYMOUS_PREFIX}{id:016x}:{tag}"))
	}

	/// Returns the layer identifier.
	pub fn identifier(&self) -> &str {
		&self.identifier
	}

	/// Returns true for layers created by [`Layer::anonymous`].
	pub fn is_anonymous(&self) -> bool {
		crate::asset_path::is_anonymous_identifier(&self.identifier)
	}

	/// Returns true if a spec exists at `path`.
	pub fn has_spec(&self, path: &Path) -> bool {
		self.specs.read().contains_key(path)
	}

	/// Returns the type of the spec at `path`.
	pub fn spec_type(&self, path: &Path) -> Option<SpecType> {
		self.specs.read().get(path).map(|s| s.spec_type)
	}

	/// Creates a spec, replacing any existing spec of a different type.
	pub fn create_spec(&self, path: &Path, spec_type: SpecType) -> Result<(), LayerError> {
		let valid = match spec_type {
			SpecType::PseudoRoot => path.is_absolute_root(),
			SpecType::Prim => path.is_prim_path() || path.is_prim_variant_selection_path(),
			SpecType::Attribute => path.is_property_path(),
			SpecType::Relationship => path.is_property_path() && !path.is_relational_attribute_path(),
		};
		if !valid {
			return Err(LayerError::InvalidSpecPath {
				path: path.clone(),
				spec_type,
			});
		}
		let mut specs = self.specs.write();
		match specs.get(path) {
			Some(existing) if existing.spec_type == spec_type => {}
			_ => {
				specs.insert(path.clone(), SpecData::new(spec_type));
			}
		}
		Ok(())
	}

	/// Removes the spec at `path`.
	pub fn remove_spec(&self, path: &Path) -> bool {
		!path.is_absolute_root() && self.specs.write().remove(path).is_some()
	}

	/// Sets a field on an existing spec.
	pub fn set_field(
		&self,
		path: &Path,
		key: FieldKey,
		value: impl Into<Value>,
	) -> Result<(), LayerError> {
		let mut specs = self.specs.write();
		let Some(spec) = specs.get_mut(path) else {
			return Err(LayerError::NoSpec {
				layer: self.identifier.clone(),
				path: path.clone(),
			});
		};
		spec.fields.insert(key, value.into());
		Ok(())
	}

	/// Clears a field, returning its previous value.
	pub fn clear_field(&self, path: &Path, key: FieldKey) -> Option<Value> {
		self.specs.write().get_mut(path)?.fields.remove(&key)
	}

	/// Returns a copy of a field value.
	pub fn field(&self, path: &Path, key: FieldKey) -> Option<Value> {
		self.specs.read().get(path)?.fields.get(&key).cloned()
	}

	/// Returns a field converted to `T`, or `None` if absent or of another type.
	pub fn field_as<T: FromFieldValue>(&self, path: &Path, key: FieldKey) -> Option<T> {
		let specs = self.specs.read();
		T::from_field(specs.get(path)?.fields.get(&key)?)
	}

	/// Defines a prim spec.
	pub fn define_prim(&self, path: &Path) -> Result<(), LayerError> {
		self.create_spec(path, SpecType::Prim)
	}

	/// Defines an attribute spec with a value type and variability.
	pub fn define_attribute(
		&self,
		path: &Path,
		type_name: &str,
		variability: Variability,
	) -> Result<(), LayerError> {
		self.create_spec(path, SpecType::Attribute)?;
		self.set_field(path, FieldKey::TypeName, type_name)?;
		self.set_field(path, FieldKey::Variability, variability)
	}

	/// Defines a relationship spec.
	pub fn define_relationship(&self, path: &Path) -> Result<(), LayerError> {
		self.create_spec(path, SpecType::Relationship)
	}

	/// Sets the permission of an existing spec.
	pub fn set_permission(&self, path: &Path, permission: Permission) -> Result<(), LayerError> {
		self.set_field(path, FieldKey::Permission, permission)
	}

	/// Sets the target list op of a relationship.
	pub fn set_target_paths(&self, path: &Path, op: ListOp<Path>) -> Result<(), LayerError> {
		self.set_field(path, FieldKey::TargetPaths, op)
	}

	/// Sets the connection list op of an attribute.
	pub fn set_connection_paths(&self, path: &Path, op: ListOp<Path>) -> Result<(), LayerError> {
		self.set_field(path, FieldKey::ConnectionPaths, op)
	}

	/// Sets the sublayer asset paths, strongest first.
	pub fn set_sublayer_paths(&self, sublayers: Vec<String>) {
		self.set_layer_metadata(FieldKey::SubLayers, Value::StringVec(sublayers));
	}

	/// Returns the sublayer asset paths, strongest first.
	pub fn sublayer_paths(&self) -> Vec<String> {
		self.field_as(&Path::absolute_root(), FieldKey::SubLayers)
			.unwrap_or_default()
	}

	/// Sets the layer's relocations as `(source, target)` pairs.
	pub fn set_relocates(&self, relocates: Vec<(Path, Path)>) {
		self.set_layer_metadata(FieldKey::Relocates, Value::Relocates(relocates));
	}

	/// Sets a field on the pseudo-root, recreating it if needed.
	fn set_layer_metadata(&self, key: FieldKey, value: Value) {
		self.specs
			.write()
			.entry(Path::absolute_root())
			.or_insert_with(|| SpecData::new(SpecType::PseudoRoot))
			.fields
			.insert(key, value);
	}

	/// Returns the layer's relocations as `(source, target)` pairs.
	pub fn relocates(&self) -> Vec<(Path, Path)> {
		self.field_as(&Path::absolute_root(), FieldKey::Relocates)
			.unwrap_or_default()
	}
}

impl fmt::Debug for Layer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Layer")
			.field("identifier", &self.identifier)
			.field("specs", &self.specs.read().len())
			.finish()
	}
}

/// Shared handle to a [`Layer`]; compares and hashes by identity.
#[derive(Clone)]
pub struct LayerRef(Arc<Layer>);

impl LayerRef {
	/// Returns a handle to the property spec at `path`, if any.
	pub fn property_at_path(&self, path: &Path) -> Option<SpecHandle> {
		self.spec_type(path)
			.filter(|ty| ty.is_property())
			.map(|_| self.handle(path))
	}

	/// Returns a handle to the attribute spec at `path`, if any.
	pub fn attribute_at_path(&self, path: &Path) -> Option<SpecHandle> {
		(self.spec_type(path)? == SpecType::Attribute).then(|| self.handle(path))
	}

	/// Returns a handle to the relationship spec at `path`, if any.
	pub fn relationship_at_path(&self, path: &Path) -> Option<SpecHandle> {
		(self.spec_type(path)? == SpecType::Relationship).then(|| self.handle(path))
	}

	fn handle(&self, path: &Path) -> SpecHandle {
		SpecHandle {
			layer: self.clone(),
			path: path.clone(),
		}
	}

	/// Returns true if both handles refer to the same layer.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl Deref for LayerRef {
	type Target = Layer;

	fn deref(&self) -> &Layer {
		&self.0
	}
}

impl PartialEq for LayerRef {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for LayerRef {}

impl Hash for LayerRef {
	fn hash<H: Hasher>(&self, state: &mut H) {
		Arc::as_ptr(&self.0).hash(state);
	}
}

impl fmt::Debug for LayerRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "LayerRef(@{}@)", self.identifier)
	}
}

impl fmt::Display for LayerRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "@{}@", self.identifier)
	}
}

/// A (layer, path) handle to a spec.
///
/// Handles stay valid after the spec is removed; accessors then report defaults.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SpecHandle {
	layer: LayerRef,
	path: Path,
}

impl SpecHandle {
	/// Returns the owning layer.
	pub fn layer(&self) -> &LayerRef {
		&self.layer
	}

	/// Returns the spec path.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Returns the spec type, or `None` if the spec no longer exists.
	pub fn spec_type(&self) -> Option<SpecType> {
		self.layer.spec_type(&self.path)
	}

	/// Returns a field converted to `T`.
	pub fn field_as<T: FromFieldValue>(&self, key: FieldKey) -> Option<T> {
		self.layer.field_as(&self.path, key)
	}

	/// Returns the declared value type of an attribute spec.
	pub fn type_name(&self) -> Option<Arc<str>> {
		self.field_as(FieldKey::TypeName)
	}

	/// Returns the authored variability, defaulting to varying.
	pub fn variability(&self) -> Variability {
		self.field_as(FieldKey::Variability).unwrap_or_default()
	}

	/// Returns the authored permission, defaulting to public.
	pub fn permission(&self) -> Permission {
		self.field_as(FieldKey::Permission).unwrap_or_default()
	}

	/// Returns a path list op field, if authored.
	pub fn path_list_op(&self, key: FieldKey) -> Option<ListOp<Path>> {
		self.field_as(key)
	}
}

impl fmt::Debug for SpecHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SpecHandle({self})")
	}
}

impl fmt::Display for SpecHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}<{}>", self.layer, self.path)
	}
}
