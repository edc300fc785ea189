use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::DynblockError;
use crate::DynblockResult;
use crate::SubstitutionMode;
use crate::TransformOptions;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"dynblock.toml",
	".dynblock.toml",
	".config/dynblock.toml",
];

/// Configuration loaded from a `dynblock.toml` file.
///
/// ```toml
/// [transform]
/// strict = true
/// substitution = "text"
/// script_syntax = true
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct DynblockConfig {
	#[serde(default)]
	pub transform: TransformConfig,
}

/// The `[transform]` table. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
	/// Abort on the first block that fails to parse. Defaults to `true`.
	#[serde(default)]
	pub strict: Option<bool>,
	/// `"text"` (default) or `"position"`.
	#[serde(default)]
	pub substitution: Option<SubstitutionMode>,
	/// Parse ```` ```ts ```` blocks. Defaults to `true`.
	#[serde(default)]
	pub script_syntax: Option<bool>,
}

impl DynblockConfig {
	/// Returns the first existing config path at `root`, if any.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> DynblockResult<Option<DynblockConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;
		tracing::debug!(path = %config_path.display(), "loaded config");

		Ok(Some(config))
	}

	pub fn parse(content: &str) -> DynblockResult<DynblockConfig> {
		toml::from_str(content).map_err(|e| DynblockError::ConfigParse(e.to_string()))
	}

	/// The options described by this config, with unset keys taking their
	/// defaults.
	pub fn options(&self) -> TransformOptions {
		let defaults = TransformOptions::default();
		let transform = &self.transform;

		TransformOptions {
			strict: transform.strict.unwrap_or(defaults.strict),
			substitution: transform.substitution.unwrap_or(defaults.substitution),
			script_syntax: transform.script_syntax.unwrap_or(defaults.script_syntax),
		}
	}
}
