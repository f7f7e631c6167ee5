//! Asset path resolution.
//!
//! A [`PathResolver`] expands search paths into concrete identifiers and maps
//! concrete identifiers to their repository form. Layer stack computation and
//! muted layer canonicalization both go through it.

use std::fmt;
use std::sync::Arc;

/// Extra resolution state carried by a layer stack identifier.
///
/// Two stacks with the same layers but different contexts are distinct stacks.
/// The default resolver treats a non-empty context as a directory searched
/// before its configured search paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolverContext(Option<Arc<str>>);

impl ResolverContext {
	/// Creates a context that searches `dir` first.
	pub fn with_search_dir(dir: impl Into<Arc<str>>) -> Self {
		Self(Some(dir.into()))
	}

	pub fn search_dir(&self) -> Option<&str> {
		self.0.as_deref()
	}
}

/// Resolves asset paths to layer identifiers.
pub trait PathResolver: Send + Sync {
	/// Returns true if `asset_path` must be expanded by [`PathResolver::resolve`].
	fn is_search_path(&self, asset_path: &str) -> bool {
		lamina_layer::is_search_path(asset_path)
	}

	/// Expands a search path, or returns `None` if nothing matches.
	fn resolve(&self, context: &ResolverContext, asset_path: &str) -> Option<String>;

	/// Returns the repository form of a resolved path, if it has one.
	fn compute_repository_path(&self, path: &str) -> Option<String>;
}

type ExistsFn = dyn Fn(&str) -> bool + Send + Sync;

/// Resolves search paths against an ordered list of directories.
///
/// Repository paths are `repo:`-prefixed paths relative to the configured
/// repository root.
#[derive(Clone)]
pub struct SearchPathResolver {
	search_paths: Vec<String>,
	repository_root: Option<String>,
	exists: Arc<ExistsFn>,
}

/// Scheme prefix of repository paths.
pub const REPOSITORY_SCHEME: &str = "repo:";

impl SearchPathResolver {
	/// Creates a resolver that checks candidates on the filesystem.
	pub fn new(search_paths: Vec<String>, repository_root: Option<String>) -> Self {
		Self {
			search_paths,
			repository_root,
			exists: Arc::new(|candidate: &str| std::path::Path::new(candidate).exists()),
		}
	}

	/// Replaces the existence check used to accept a candidate.
	#[must_use]
	pub fn with_exists(mut self, exists: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
		self.exists = Arc::new(exists);
		self
	}

	fn candidates<'a>(&'a self, context: &'a ResolverContext) -> impl Iterator<Item = &'a str> {
		context
			.search_dir()
			.into_iter()
			.chain(self.search_paths.iter().map(String::as_str))
	}
}

impl PathResolver for SearchPathResolver {
	fn resolve(&self, context: &ResolverContext, asset_path: &str) -> Option<String> {
		self.candidates(context)
			.map(|dir| format!("{}/{}", dir.trim_end_matches('/'), asset_path))
			.find(|candidate| (self.exists)(candidate))
	}

	fn compute_repository_path(&self, path: &str) -> Option<String> {
		let root = self.repository_root.as_deref()?.trim_end_matches('/');
		let rest = path.strip_prefix(root)?;
		rest.starts_with('/')
			.then(|| format!("{REPOSITORY_SCHEME}{rest}"))
	}
}

impl Default for SearchPathResolver {
	fn default() -> Self {
		Self::new(Vec::new(), None)
	}
}

impl fmt::Debug for SearchPathResolver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SearchPathResolver")
			.field("search_paths", &self.search_paths)
			.field("repository_root", &self.repository_root)
			.finish_non_exhaustive()
	}
}
