//! Composition configuration.
//!
//! Configuration is written in TOML:
//!
//! ```toml
//! usd_mode = false
//! search_paths = ["/studio/assets", "/studio/lib"]
//! repository_root = "/studio"
//! cull_culled_nodes = true
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::resolver::SearchPathResolver;

/// Settings shared by the registry, caches, and indexers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositionConfig {
	/// Flattened composition: no permission or relocation enforcement.
	pub usd_mode: bool,
	/// Directories searched, in order, when resolving search paths.
	pub search_paths: Vec<String>,
	/// Directory that repository paths are made relative to.
	pub repository_root: Option<String>,
	/// Prim indices drop culled nodes. Targets whose authoring node is missing
	/// from the target's prim index are legal either way; when unset the
	/// fallback is logged as a warning.
	pub cull_culled_nodes: bool,
}

impl Default for CompositionConfig {
	fn default() -> Self {
		Self {
			usd_mode: false,
			search_paths: Vec::new(),
			repository_root: None,
			cull_culled_nodes: true,
		}
	}
}

impl CompositionConfig {
	/// Parses configuration from TOML text.
	pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a configuration file.
	pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: PathBuf::from(path),
			error,
		})?;
		let config = Self::from_toml_str(&input)?;
		tracing::debug!(path = %path.display(), usd_mode = config.usd_mode, "loaded composition config");
		Ok(config)
	}

	fn validate(&self) -> ConfigResult<()> {
		if self.search_paths.iter().any(|p| p.trim().is_empty()) {
			return Err(ConfigError::EmptySearchPath);
		}
		Ok(())
	}

	/// Builds the resolver described by this configuration.
	pub fn resolver(&self) -> SearchPathResolver {
		SearchPathResolver::new(self.search_paths.clone(), self.repository_root.clone())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	/// An empty document yields the defaults.
	#[test]
	fn test_empty_config_is_default() {
		assert_eq!(CompositionConfig::from_toml_str("").unwrap(), CompositionConfig::default());
	}

	/// All keys parse.
	#[test]
	fn test_full_config() {
		let config = CompositionConfig::from_toml_str(
			r#"
			usd_mode = true
			search_paths = ["/a", "/b"]
			repository_root = "/studio"
			cull_culled_nodes = false
			"#,
		)
		.unwrap();
		assert_eq!(
			config,
			CompositionConfig {
				usd_mode: true,
				search_paths: vec!["/a".into(), "/b".into()],
				repository_root: Some("/studio".into()),
				cull_culled_nodes: false,
			}
		);
	}

	/// Unknown keys are rejected.
	#[test]
	fn test_unknown_key() {
		assert!(matches!(
			CompositionConfig::from_toml_str("usd = true"),
			Err(ConfigError::Toml(_))
		));
	}

	/// Blank search paths are rejected.
	#[test]
	fn test_blank_search_path() {
		assert!(matches!(
			CompositionConfig::from_toml_str(r#"search_paths = ["/a", " "]"#),
			Err(ConfigError::EmptySearchPath)
		));
	}
}
