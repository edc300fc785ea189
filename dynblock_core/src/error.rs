use miette::Diagnostic;
use thiserror::Error;

use crate::SyntaxTag;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum DynblockError {
	#[error(transparent)]
	#[diagnostic(code(dynblock::io_error))]
	Io(#[from] std::io::Error),

	#[error("invalid `json` block at {line}:{column}: {message}")]
	#[diagnostic(
		code(dynblock::invalid_data_block),
		help("the body of a `json` block must be a single JSON object")
	)]
	InvalidDataBlock {
		message: String,
		line: usize,
		column: usize,
	},

	#[error("invalid `ts` block at {line}:{column}: {message}")]
	#[diagnostic(
		code(dynblock::invalid_script_block),
		help(
			"`ts` blocks only accept declarations of literal data, e.g. `const spec = {{ type: \
			 \"dynamicRenderer\", id: \"chart\" }};`"
		)
	)]
	InvalidScriptBlock {
		message: String,
		line: usize,
		column: usize,
	},

	#[error("`ts` block at {line}:{column} does not declare `spec`")]
	#[diagnostic(
		code(dynblock::missing_spec),
		help("add `const spec = {{ ... }};` to the block")
	)]
	MissingSpec { line: usize, column: usize },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(dynblock::config_parse),
		help("check that dynblock.toml is valid TOML with a [transform] section")
	)]
	ConfigParse(String),
}

impl DynblockError {
	/// Returns true for errors raised while parsing a single fenced block.
	/// These are the errors that lenient mode downgrades to diagnostics.
	pub fn is_block_error(&self) -> bool {
		matches!(
			self,
			Self::InvalidDataBlock { .. } | Self::InvalidScriptBlock { .. } | Self::MissingSpec { .. }
		)
	}

	/// The syntax of the block that produced this error, if any.
	pub fn syntax(&self) -> Option<SyntaxTag> {
		match self {
			Self::InvalidDataBlock { .. } => Some(SyntaxTag::Data),
			Self::InvalidScriptBlock { .. } | Self::MissingSpec { .. } => Some(SyntaxTag::Script),
			_ => None,
		}
	}
}

pub type DynblockResult<T> = Result<T, DynblockError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
