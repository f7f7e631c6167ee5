use lamina_primitives::{Element, Path};

/// Maps paths between a node's namespace and its parent's.
///
/// A map function is a set of `(source, target)` prefix pairs. A path maps
/// through the pair with the longest matching source prefix, and only if the
/// result maps back through the same pair; otherwise a more specific pair
/// claims the result and the path is outside the function's domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MapFunction {
	pairs: Vec<(Path, Path)>,
}

impl MapFunction {
	/// Creates a map function from `(source, target)` pairs.
	pub fn new(pairs: impl IntoIterator<Item = (Path, Path)>) -> Self {
		let mut pairs: Vec<(Path, Path)> = pairs.into_iter().collect();
		pairs.sort();
		pairs.dedup();
		Self { pairs }
	}

	/// Maps every path to itself.
	pub fn identity() -> Self {
		Self::new([(Path::absolute_root(), Path::absolute_root())])
	}

	/// Maps `source` to `target`, plus the root identity so paths outside
	/// `source` keep their names.
	pub fn with_root_identity(source: Path, target: Path) -> Self {
		Self::new([(Path::absolute_root(), Path::absolute_root()), (source, target)])
	}

	/// Returns true if this function maps every path to itself.
	pub fn is_identity(&self) -> bool {
		self.pairs.iter().all(|(s, t)| s == t)
			&& self.pairs.iter().any(|(s, _)| s.is_absolute_root())
	}

	/// Returns true if this function maps nothing.
	pub fn is_null(&self) -> bool {
		self.pairs.is_empty()
	}

	pub fn pairs(&self) -> &[(Path, Path)] {
		&self.pairs
	}

	/// Returns the function mapping targets back to sources.
	#[must_use]
	pub fn inverse(&self) -> Self {
		Self::new(self.pairs.iter().map(|(s, t)| (t.clone(), s.clone())))
	}

	/// Maps a path from the source namespace into the target namespace.
	pub fn map_source_to_target(&self, path: &Path) -> Option<Path> {
		map(&self.pairs, path, Direction::Forward)
	}

	/// Maps a path from the target namespace back into the source namespace.
	pub fn map_target_to_source(&self, path: &Path) -> Option<Path> {
		map(&self.pairs, path, Direction::Backward)
	}
}

#[derive(Clone, Copy)]
enum Direction {
	Forward,
	Backward,
}

impl Direction {
	fn ends<'a>(self, pair: &'a (Path, Path)) -> (&'a Path, &'a Path) {
		match self {
			Self::Forward => (&pair.0, &pair.1),
			Self::Backward => (&pair.1, &pair.0),
		}
	}

	fn reversed(self) -> Self {
		match self {
			Self::Forward => Self::Backward,
			Self::Backward => Self::Forward,
		}
	}
}

fn best_match<'a>(pairs: &'a [(Path, Path)], path: &Path, dir: Direction) -> Option<&'a (Path, Path)> {
	pairs
		.iter()
		.filter(|pair| path.has_prefix(dir.ends(pair).0))
		.max_by_key(|pair| dir.ends(pair).0.element_count())
}

fn map(pairs: &[(Path, Path)], path: &Path, dir: Direction) -> Option<Path> {
	let pair = best_match(pairs, path, dir)?;
	let (from, to) = dir.ends(pair);
	let mapped = path.replace_prefix(from, to)?;

	let back = best_match(pairs, &mapped, dir.reversed())?;
	if !std::ptr::eq(back, pair) {
		return None;
	}

	// Embedded targets live in the same namespace as the path itself.
	let prefix_len = to.element_count();
	if !mapped.elements()[prefix_len..]
		.iter()
		.any(|e| matches!(e, Element::Target(_)))
	{
		return Some(mapped);
	}
	let mut elements = mapped.elements()[..prefix_len].to_vec();
	for element in &mapped.elements()[prefix_len..] {
		match element {
			Element::Target(target) => elements.push(Element::Target(map(pairs, target, dir)?)),
			other => elements.push(other.clone()),
		}
	}
	Some(Path::from_elements(elements))
}
