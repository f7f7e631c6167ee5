//! Absolute scene namespace paths.
//!
//! A [`Path`] is an immutable, cheaply clonable sequence of [`Element`]s. The
//! supported grammar covers everything the composition engine reads:
//!
//! ```text
//! /                           absolute root
//! /World/Chair                prim path
//! /Model{shading=red}Geom     prim path through a variant selection
//! /World/Chair.size           property path
//! /World/Chair.rel[/Target]   relationship target path
//! /World/Chair.rel[/T].attr   relational attribute path
//! ```
//!
//! Only absolute paths exist; anchoring of relative paths happens before a
//! path reaches this type.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

/// One component of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
	/// A prim name (`/Name`).
	Prim(Arc<str>),
	/// A variant selection attached to the preceding prim (`{set=selection}`).
	VariantSelection {
		/// Variant set name.
		set: Arc<str>,
		/// Selected variant; may be empty.
		selection: Arc<str>,
	},
	/// A property name (`.name`).
	Property(Arc<str>),
	/// A relationship target (`[/Path]`).
	Target(Path),
	/// A property attached to a relationship target (`.name` after a target).
	RelationalAttribute(Arc<str>),
}

impl Element {
	fn is_prim_like(&self) -> bool {
		matches!(self, Self::Prim(_) | Self::VariantSelection { .. })
	}
}

/// An absolute path in scene namespace.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
	elements: Arc<[Element]>,
}

/// Path syntax error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path {input:?} at byte {offset}: {reason}")]
pub struct PathParseError {
	/// The rejected input.
	pub input: String,
	/// Byte offset where parsing failed.
	pub offset: usize,
	/// Short description of the failure.
	pub reason: &'static str,
}

impl Path {
	/// Returns the absolute root path `/`.
	pub fn absolute_root() -> Self {
		Self::from_elements(Vec::new())
	}

	/// Parses an absolute path.
	pub fn parse(input: &str) -> Result<Self, PathParseError> {
		let mut parser = Parser {
			bytes: input.as_bytes(),
			pos: 0,
		};
		let fail = |offset: usize, reason: &'static str| PathParseError {
			input: input.to_owned(),
			offset,
			reason,
		};
		let path = parser
			.absolute()
			.map_err(|reason| fail(parser.pos, reason))?;
		if parser.pos != parser.bytes.len() {
			return Err(fail(parser.pos, "unexpected trailing characters"));
		}
		Ok(path)
	}

	/// Builds a path from raw elements.
	pub fn from_elements(elements: Vec<Element>) -> Self {
		Self {
			elements: Arc::from(elements),
		}
	}

	/// Returns the path elements, root first.
	pub fn elements(&self) -> &[Element] {
		&self.elements
	}

	/// Returns the number of elements.
	pub fn element_count(&self) -> usize {
		self.elements.len()
	}

	/// Returns true for `/`.
	pub fn is_absolute_root(&self) -> bool {
		self.elements.is_empty()
	}

	/// Returns true for a path naming a prim (possibly through variant selections).
	pub fn is_prim_path(&self) -> bool {
		matches!(self.elements.last(), Some(Element::Prim(_)))
			&& self.elements.iter().all(Element::is_prim_like)
	}

	/// Returns true when the last element is a variant selection.
	pub fn is_prim_variant_selection_path(&self) -> bool {
		matches!(self.elements.last(), Some(Element::VariantSelection { .. }))
	}

	/// Returns true for property and relational attribute paths.
	pub fn is_property_path(&self) -> bool {
		matches!(
			self.elements.last(),
			Some(Element::Property(_) | Element::RelationalAttribute(_))
		)
	}

	/// Returns true for `/Prim.rel[/Target].attr` paths.
	pub fn is_relational_attribute_path(&self) -> bool {
		matches!(self.elements.last(), Some(Element::RelationalAttribute(_)))
	}

	/// Returns true for `/Prim.rel[/Target]` paths.
	pub fn is_target_path(&self) -> bool {
		matches!(self.elements.last(), Some(Element::Target(_)))
	}

	/// Returns the leading prim (and variant selection) portion of the path.
	pub fn prim_path(&self) -> Self {
		let len = self.prim_prefix_len();
		if len == self.elements.len() {
			return self.clone();
		}
		Self::from_elements(self.elements[..len].to_vec())
	}

	/// Splits the path into its prim portion and the remaining elements.
	pub fn split_prim_prefix(&self) -> (Self, &[Element]) {
		let len = self.prim_prefix_len();
		(
			Self::from_elements(self.elements[..len].to_vec()),
			&self.elements[len..],
		)
	}

	fn prim_prefix_len(&self) -> usize {
		self.elements
			.iter()
			.position(|e| !e.is_prim_like())
			.unwrap_or(self.elements.len())
	}

	/// Returns the parent path, or `None` for the absolute root.
	pub fn parent(&self) -> Option<Self> {
		let (_, head) = self.elements.split_last()?;
		Some(Self::from_elements(head.to_vec()))
	}

	/// Returns the name of the last element.
	///
	/// Variant selections report the selected variant; target elements have no name.
	pub fn name(&self) -> Option<&str> {
		match self.elements.last()? {
			Element::Prim(name) | Element::Property(name) | Element::RelationalAttribute(name) => {
				Some(name)
			}
			Element::VariantSelection { selection, .. } => Some(selection),
			Element::Target(_) => None,
		}
	}

	/// Returns the innermost relationship target embedded in this path.
	pub fn target_path(&self) -> Option<&Self> {
		self.elements.iter().rev().find_map(|e| match e {
			Element::Target(target) => Some(target),
			_ => None,
		})
	}

	/// Returns true if `prefix` is an element-wise prefix of this path.
	pub fn has_prefix(&self, prefix: &Self) -> bool {
		self.elements.starts_with(&prefix.elements)
	}

	/// Replaces `old` with `new` at the front of this path.
	///
	/// Returns `None` when `old` is not a prefix.
	pub fn replace_prefix(&self, old: &Self, new: &Self) -> Option<Self> {
		if !self.has_prefix(old) {
			return None;
		}
		if old == new {
			return Some(self.clone());
		}
		Some(new.append_elements(&self.elements[old.elements.len()..]))
	}

	/// Returns a copy of this path with `tail` appended.
	pub fn append_elements(&self, tail: &[Element]) -> Self {
		let mut elements = Vec::with_capacity(self.elements.len() + tail.len());
		elements.extend_from_slice(&self.elements);
		elements.extend_from_slice(tail);
		Self::from_elements(elements)
	}

	fn append(&self, element: Element) -> Self {
		self.append_elements(std::slice::from_ref(&element))
	}

	/// Appends a child prim.
	pub fn append_child(&self, name: &str) -> Self {
		debug_assert!(self.is_absolute_root() || self.elements.iter().all(Element::is_prim_like));
		self.append(Element::Prim(name.into()))
	}

	/// Appends a variant selection.
	pub fn append_variant_selection(&self, set: &str, selection: &str) -> Self {
		self.append(Element::VariantSelection {
			set: set.into(),
			selection: selection.into(),
		})
	}

	/// Appends a property name.
	pub fn append_property(&self, name: &str) -> Self {
		self.append(Element::Property(name.into()))
	}

	/// Appends a relationship target.
	pub fn append_target(&self, target: Self) -> Self {
		debug_assert!(matches!(self.elements.last(), Some(Element::Property(_))));
		self.append(Element::Target(target))
	}

	/// Appends a relational attribute name.
	pub fn append_relational_attribute(&self, name: &str) -> Self {
		debug_assert!(self.is_target_path());
		self.append(Element::RelationalAttribute(name.into()))
	}

	/// Removes every variant selection from the prim portion of the path.
	pub fn strip_variant_selections(&self) -> Self {
		if !self
			.elements
			.iter()
			.any(|e| matches!(e, Element::VariantSelection { .. }))
		{
			return self.clone();
		}
		Self::from_elements(
			self.elements
				.iter()
				.filter(|e| !matches!(e, Element::VariantSelection { .. }))
				.cloned()
				.collect(),
		)
	}
}

impl Default for Path {
	fn default() -> Self {
		Self::absolute_root()
	}
}

impl FromStr for Path {
	type Err = PathParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.elements.is_empty() {
			return f.write_str("/");
		}
		let mut after_variant = false;
		for element in self.elements.iter() {
			match element {
				Element::Prim(name) => {
					if !after_variant {
						f.write_str("/")?;
					}
					f.write_str(name)?;
				}
				Element::VariantSelection { set, selection } => {
					write!(f, "{{{set}={selection}}}")?;
				}
				Element::Property(name) | Element::RelationalAttribute(name) => {
					write!(f, ".{name}")?;
				}
				Element::Target(target) => write!(f, "[{target}]")?,
			}
			after_variant = matches!(element, Element::VariantSelection { .. });
		}
		Ok(())
	}
}

impl fmt::Debug for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Path({self})")
	}
}

struct Parser<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl Parser<'_> {
	fn peek(&self) -> Option<u8> {
		self.bytes.get(self.pos).copied()
	}

	fn expect(&mut self, byte: u8) -> Result<(), &'static str> {
		if self.peek() != Some(byte) {
			return Err(match byte {
				b'/' => "expected '/'",
				b']' => "expected ']'",
				b'=' => "expected '='",
				b'}' => "expected '}'",
				_ => "unexpected character",
			});
		}
		self.pos += 1;
		Ok(())
	}

	fn identifier(&mut self, namespaced: bool) -> Result<Arc<str>, &'static str> {
		let start = self.pos;
		match self.peek() {
			Some(c) if c.is_ascii_alphabetic() || c == b'_' => self.pos += 1,
			_ => return Err("expected identifier"),
		}
		while let Some(c) = self.peek() {
			if c.is_ascii_alphanumeric() || c == b'_' || (namespaced && c == b':') {
				self.pos += 1;
			} else {
				break;
			}
		}
		self.slice(start)
	}

	fn slice(&self, start: usize) -> Result<Arc<str>, &'static str> {
		std::str::from_utf8(&self.bytes[start..self.pos])
			.map(Arc::from)
			.map_err(|_| "invalid utf-8")
	}

	fn absolute(&mut self) -> Result<Path, &'static str> {
		self.expect(b'/')?;
		let mut elements = Vec::new();
		if matches!(self.peek(), None | Some(b']')) {
			return Ok(Path::from_elements(elements));
		}

		loop {
			elements.push(Element::Prim(self.identifier(false)?));
			while self.peek() == Some(b'{') {
				elements.push(self.variant_selection()?);
			}
			match self.peek() {
				Some(b'/') => self.pos += 1,
				Some(b'.') => break,
				Some(c)
					if (c.is_ascii_alphabetic() || c == b'_')
						&& matches!(elements.last(), Some(Element::VariantSelection { .. })) => {}
				_ => return Ok(Path::from_elements(elements)),
			}
		}

		self.pos += 1;
		elements.push(Element::Property(self.identifier(true)?));
		if self.peek() == Some(b'[') {
			self.pos += 1;
			let target = self.absolute()?;
			self.expect(b']')?;
			elements.push(Element::Target(target));
			if self.peek() == Some(b'.') {
				self.pos += 1;
				elements.push(Element::RelationalAttribute(self.identifier(true)?));
			}
		}
		Ok(Path::from_elements(elements))
	}

	fn variant_selection(&mut self) -> Result<Element, &'static str> {
		self.pos += 1;
		let set = self.identifier(false)?;
		self.expect(b'=')?;
		let start = self.pos;
		while let Some(c) = self.peek() {
			if c.is_ascii_alphanumeric() || c == b'_' || c == b'-' {
				self.pos += 1;
			} else {
				break;
			}
		}
		let selection = self.slice(start)?;
		self.expect(b'}')?;
		Ok(Element::VariantSelection { set, selection })
	}
}

#[cfg(test)]
mod tests;
