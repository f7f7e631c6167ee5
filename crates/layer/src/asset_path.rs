//! Asset path classification and anchoring.
//!
//! Asset paths come in three flavours:
//!
//! - absolute paths (`/a/b.usda`) and scheme paths (`repo:/a/b.usda`), used as-is;
//! - anchored relative paths (`./b.usda`, `../b.usda`), joined to the directory of
//!   the layer that authored them;
//! - search paths (`b.usda`, `dir/b.usda`), left for the resolver to expand.

/// Prefix of anonymous layer identifiers.
pub const ANONYMOUS_PREFIX: &str = "anon:";

/// Returns true for identifiers of anonymous layers.
pub fn is_anonymous_identifier(identifier: &str) -> bool {
	identifier.starts_with(ANONYMOUS_PREFIX)
}

/// Returns true for relative paths that are not explicitly anchored.
pub fn is_search_path(asset_path: &str) -> bool {
	!asset_path.is_empty()
		&& !is_anonymous_identifier(asset_path)
		&& !is_absolute(asset_path)
		&& !is_anchored_relative(asset_path)
}

fn is_absolute(asset_path: &str) -> bool {
	asset_path.starts_with('/') || asset_path.starts_with('\\') || has_scheme(asset_path)
}

fn is_anchored_relative(asset_path: &str) -> bool {
	asset_path.starts_with("./") || asset_path.starts_with("../") || asset_path == "." || asset_path == ".."
}

/// Returns true for `scheme:...` paths such as `repo:/a.usda`.
fn has_scheme(asset_path: &str) -> bool {
	let Some((scheme, _)) = asset_path.split_once(':') else {
		return false;
	};
	// Single letters are drive prefixes, not schemes.
	scheme.len() > 1
		&& scheme.starts_with(|c: char| c.is_ascii_alphabetic())
		&& scheme
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Anchors `asset_path` to the layer identified by `anchor`.
///
/// Only anchored relative paths are rewritten. Anonymous anchors have no
/// directory, so nothing is anchored to them.
pub fn compute_asset_path_relative_to_layer(anchor: &str, asset_path: &str) -> String {
	if asset_path.is_empty() || is_anonymous_identifier(asset_path) {
		return asset_path.to_owned();
	}
	if !is_anchored_relative(asset_path) || is_anonymous_identifier(anchor) {
		return asset_path.to_owned();
	}
	let dir = match anchor.rfind('/') {
		Some(idx) => &anchor[..=idx],
		None => "",
	};
	normalize(&format!("{dir}{asset_path}"))
}

/// Collapses `.` and `..` components and repeated separators.
fn normalize(path: &str) -> String {
	let (prefix, rest) = match path.split_once(':') {
		Some((scheme, rest)) if has_scheme(path) => (format!("{scheme}:"), rest),
		_ => (String::new(), path),
	};
	let absolute = rest.starts_with('/');
	let mut parts: Vec<&str> = Vec::new();
	for part in rest.split('/') {
		match part {
			"" | "." => {}
			".." => {
				if parts.last().is_some_and(|last| *last != "..") {
					parts.pop();
				} else if !absolute {
					parts.push("..");
				}
			}
			part => parts.push(part),
		}
	}
	let joined = parts.join("/");
	if absolute {
		format!("{prefix}/{joined}")
	} else {
		format!("{prefix}{joined}")
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("/shots/a.usda", "./b.usda", "/shots/b.usda")]
	#[case("/shots/seq/a.usda", "../b.usda", "/shots/b.usda")]
	#[case("/shots/a.usda", "../../../b.usda", "/b.usda")]
	#[case("/shots/a.usda", "/abs/b.usda", "/abs/b.usda")]
	#[case("/shots/a.usda", "lib/b.usda", "lib/b.usda")]
	#[case("/shots/a.usda", "anon:0001:x", "anon:0001:x")]
	#[case("anon:0002:x", "./b.usda", "./b.usda")]
	#[case("repo:/shots/a.usda", "./b.usda", "repo:/shots/b.usda")]
	#[case("rel/a.usda", "./sub/./b.usda", "rel/sub/b.usda")]
	fn test_anchoring(#[case] anchor: &str, #[case] asset: &str, #[case] expected: &str) {
		assert_eq!(compute_asset_path_relative_to_layer(anchor, asset), expected);
	}

	#[rstest]
	#[case("b.usda", true)]
	#[case("lib/b.usda", true)]
	#[case("./b.usda", false)]
	#[case("../b.usda", false)]
	#[case("/b.usda", false)]
	#[case("repo:/b.usda", false)]
	#[case("anon:0001", false)]
	#[case("", false)]
	fn test_search_path_classification(#[case] asset: &str, #[case] expected: bool) {
		assert_eq!(is_search_path(asset), expected);
	}

	/// Anonymous identifiers are recognised only by their prefix.
	#[test]
	fn test_anonymous_identifier() {
		assert!(is_anonymous_identifier("anon:00:session"));
		assert!(!is_anonymous_identifier("/anon:00"));
	}
}
