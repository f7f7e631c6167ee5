//! Ordered list editing operations.
//!
//! # Role
//!
//! A [`ListOp`] is an edit script authored in one layer. Composing a list means
//! applying the list ops of every contributing spec in weak-to-strong order to
//! a single accumulator, so the strongest opinion is applied last.
//!
//! # Invariants
//!
//! - An explicit list op replaces the accumulator outright; item-wise operations are ignored.
//! - Item-wise operations apply in the fixed order delete, add, prepend, append, reorder.
//! - The accumulator never holds duplicates after any operation.

use std::hash::Hash;

use thiserror::Error;

/// The operation an item is being visited for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListOpType {
	Explicit,
	Added,
	Prepended,
	Appended,
	Deleted,
	Ordered,
}

/// Error raised when a list op is constructed with duplicate items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("duplicate item in {op:?} list")]
pub struct DuplicateItemError {
	/// Which item list contained the duplicate.
	pub op: ListOpType,
}

/// An edit script over an ordered list of unique items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOp<T> {
	explicit: bool,
	explicit_items: Vec<T>,
	added_items: Vec<T>,
	prepended_items: Vec<T>,
	appended_items: Vec<T>,
	deleted_items: Vec<T>,
	ordered_items: Vec<T>,
}

impl<T> Default for ListOp<T> {
	fn default() -> Self {
		Self {
			explicit: false,
			explicit_items: Vec::new(),
			added_items: Vec::new(),
			prepended_items: Vec::new(),
			appended_items: Vec::new(),
			deleted_items: Vec::new(),
			ordered_items: Vec::new(),
		}
	}
}

impl<T> ListOp<T>
where
	T: Clone + Eq + Hash,
{
	/// Creates an explicit list op that replaces any weaker opinion.
	pub fn explicit(items: Vec<T>) -> Self {
		Self {
			explicit: true,
			explicit_items: items,
			..Self::default()
		}
	}

	/// Sets the items to add when absent.
	#[must_use]
	pub fn with_added(mut self, items: Vec<T>) -> Self {
		self.explicit = false;
		self.added_items = items;
		self
	}

	/// Sets the items moved to the front.
	#[must_use]
	pub fn with_prepended(mut self, items: Vec<T>) -> Self {
		self.explicit = false;
		self.prepended_items = items;
		self
	}

	/// Sets the items moved to the back.
	#[must_use]
	pub fn with_appended(mut self, items: Vec<T>) -> Self {
		self.explicit = false;
		self.appended_items = items;
		self
	}

	/// Sets the items to remove.
	#[must_use]
	pub fn with_deleted(mut self, items: Vec<T>) -> Self {
		self.explicit = false;
		self.deleted_items = items;
		self
	}

	/// Sets the preferred relative order.
	#[must_use]
	pub fn with_ordered(mut self, items: Vec<T>) -> Self {
		self.explicit = false;
		self.ordered_items = items;
		self
	}

	/// Rejects list ops whose item lists contain duplicates.
	pub fn validate(&self) -> Result<(), DuplicateItemError> {
		for (op, items) in self.item_lists() {
			let mut seen = std::collections::HashSet::with_capacity(items.len());
			if !items.iter().all(|item| seen.insert(item)) {
				return Err(DuplicateItemError { op });
			}
		}
		Ok(())
	}

	fn item_lists(&self) -> [(ListOpType, &[T]); 6] {
		[
			(ListOpType::Explicit, self.explicit_items.as_slice()),
			(ListOpType::Added, self.added_items.as_slice()),
			(ListOpType::Prepended, self.prepended_items.as_slice()),
			(ListOpType::Appended, self.appended_items.as_slice()),
			(ListOpType::Deleted, self.deleted_items.as_slice()),
			(ListOpType::Ordered, self.ordered_items.as_slice()),
		]
	}

	/// Returns true if this op replaces weaker opinions.
	pub fn is_explicit(&self) -> bool {
		self.explicit
	}

	/// Returns true if applying this op can change a list.
	///
	/// An explicit op always has keys, even when empty, since it clears the list.
	pub fn has_keys(&self) -> bool {
		if self.explicit {
			return true;
		}
		!(self.added_items.is_empty()
			&& self.prepended_items.is_empty()
			&& self.appended_items.is_empty()
			&& self.deleted_items.is_empty()
			&& self.ordered_items.is_empty())
	}

	/// Returns the items for one operation.
	pub fn items(&self, op: ListOpType) -> &[T] {
		match op {
			ListOpType::Explicit => &self.explicit_items,
			ListOpType::Added => &self.added_items,
			ListOpType::Prepended => &self.prepended_items,
			ListOpType::Appended => &self.appended_items,
			ListOpType::Deleted => &self.deleted_items,
			ListOpType::Ordered => &self.ordered_items,
		}
	}

	/// Applies this op to `list`, visiting every item through `translate`.
	///
	/// `translate` maps an authored item into the accumulator's item space; returning
	/// `None` drops the item from the operation being applied.
	pub fn apply_operations<F>(&self, list: &mut Vec<T>, mut translate: F)
	where
		F: FnMut(ListOpType, &T) -> Option<T>,
	{
		if self.explicit {
			list.clear();
			for item in &self.explicit_items {
				if let Some(item) = translate(ListOpType::Explicit, item)
					&& !list.contains(&item)
				{
					list.push(item);
				}
			}
			return;
		}

		for item in &self.deleted_items {
			if let Some(item) = translate(ListOpType::Deleted, item) {
				list.retain(|existing| *existing != item);
			}
		}

		for item in &self.added_items {
			if let Some(item) = translate(ListOpType::Added, item)
				&& !list.contains(&item)
			{
				list.push(item);
			}
		}

		let prepended = translate_unique(&self.prepended_items, ListOpType::Prepended, &mut translate);
		if !prepended.is_empty() {
			list.retain(|existing| !prepended.contains(existing));
			let mut merged = prepended;
			merged.append(list);
			*list = merged;
		}

		let appended = translate_unique(&self.appended_items, ListOpType::Appended, &mut translate);
		if !appended.is_empty() {
			list.retain(|existing| !appended.contains(existing));
			list.extend(appended);
		}

		let ordered = translate_unique(&self.ordered_items, ListOpType::Ordered, &mut translate);
		reorder(list, &ordered);
	}

	/// Applies this op without translating items.
	pub fn apply(&self, list: &mut Vec<T>) {
		self.apply_operations(list, |_, item| Some(item.clone()));
	}
}

fn translate_unique<T, F>(items: &[T], op: ListOpType, translate: &mut F) -> Vec<T>
where
	T: Eq,
	F: FnMut(ListOpType, &T) -> Option<T>,
{
	let mut out: Vec<T> = Vec::with_capacity(items.len());
	for item in items {
		if let Some(item) = translate(op, item)
			&& !out.contains(&item)
		{
			out.push(item);
		}
	}
	out
}

/// Moves items named in `order` into that relative order.
///
/// Each ordered item drags along the run of unordered items that follow it.
/// Unordered items that precede every ordered item stay at the front.
fn reorder<T: Clone + Eq>(list: &mut Vec<T>, order: &[T]) {
	if order.is_empty() {
		return;
	}
	let mut scratch = std::mem::take(list);
	for item in order {
		let Some(start) = scratch.iter().position(|x| x == item) else {
			continue;
		};
		let end = scratch[start + 1..]
			.iter()
			.position(|x| order.contains(x))
			.map_or(scratch.len(), |offset| start + 1 + offset);
		list.extend(scratch.drain(start..end));
	}
	scratch.append(list);
	*list = scratch;
}

#[cfg(test)]
mod tests;
