use std::sync::Arc;

use derive_more::Deref;
use serde::Deserialize;
use serde::Serialize;

use crate::ComponentDescriptor;
use crate::DynblockError;
use crate::DynblockResult;
use crate::Props;
use crate::RawBlock;
use crate::SyntaxTag;
use crate::extract_blocks;
use crate::parse_block;

/// How matched blocks are swapped for their anchors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SubstitutionMode {
	/// Replace every occurrence of a matched block's text. Blocks whose text
	/// repeats verbatim all receive the first anchor minted for that text.
	#[default]
	Text,
	/// Replace each matched block at its own position, so every anchor gets
	/// exactly one placeholder.
	Position,
}

/// Settings shared by every stage of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
	/// Abort on the first block that cannot be parsed. When `false` the block
	/// is left in place and reported as a [`TransformDiagnostic`].
	pub strict: bool,
	/// How matched blocks are replaced.
	pub substitution: SubstitutionMode,
	/// Parse ```` ```ts ```` blocks. When `false` they are never extracted and
	/// stay in the content as plain text.
	pub script_syntax: bool,
}

impl Default for TransformOptions {
	fn default() -> Self {
		Self {
			strict: true,
			substitution: SubstitutionMode::Text,
			script_syntax: true,
		}
	}
}

impl TransformOptions {
	/// The tags scanned under these options, in numbering order.
	pub fn tags(&self) -> impl Iterator<Item = SyntaxTag> + '_ {
		SyntaxTag::PRECEDENCE
			.into_iter()
			.filter(|tag| *tag != SyntaxTag::Script || self.script_syntax)
	}
}

/// The identifier of a placeholder: `{rendererId}-{index}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Serialize)]
#[serde(transparent)]
pub struct AnchorId(String);

impl AnchorId {
	pub fn new(renderer_id: &str, index: usize) -> Self {
		Self(format!("{renderer_id}-{index}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// The markup that marks where the component is mounted.
	pub fn markup(&self) -> String {
		format!("<div id=\"{}\"></div>", self.0)
	}
}

impl std::fmt::Display for AnchorId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A non-fatal problem found while transforming content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[non_exhaustive]
pub enum TransformDiagnostic {
	/// A block could not be parsed and was left in the content unchanged.
	/// Only produced when [`TransformOptions::strict`] is `false`.
	#[serde(rename_all = "camelCase")]
	InvalidBlock {
		syntax: SyntaxTag,
		message: String,
		line: usize,
		column: usize,
	},
	/// A binding was minted for a block whose text had already been replaced
	/// by an earlier anchor, so no placeholder exists for it.
	#[serde(rename_all = "camelCase")]
	CollapsedDuplicate {
		anchor_id: AnchorId,
		line: usize,
		column: usize,
	},
}

/// A block that matched a renderer identity, with its position in the
/// identity's match sequence.
#[derive(Debug, Clone)]
pub struct MatchedBlock<'a> {
	/// Zero-based position within the renderer identity's matches.
	pub index: usize,
	pub block: RawBlock<'a>,
	pub descriptor: ComponentDescriptor,
}

impl MatchedBlock<'_> {
	pub fn anchor_id(&self) -> AnchorId {
		AnchorId::new(&self.descriptor.id, self.index)
	}
}

/// A block skipped in lenient mode because it failed to parse.
#[derive(Debug)]
pub struct SkippedBlock<'a> {
	pub block: RawBlock<'a>,
	pub error: DynblockError,
}

impl SkippedBlock<'_> {
	pub fn to_diagnostic(&self) -> TransformDiagnostic {
		let (line, column) = match &self.error {
			DynblockError::InvalidDataBlock { line, column, .. }
			| DynblockError::InvalidScriptBlock { line, column, .. }
			| DynblockError::MissingSpec { line, column } => (*line, *column),
			_ => (
				self.block.position.start.line,
				self.block.position.start.column,
			),
		};

		TransformDiagnostic::InvalidBlock {
			syntax: self.block.tag,
			message: self.error.to_string(),
			line,
			column,
		}
	}
}

/// Every block of one content string that matches one renderer identity.
#[derive(Debug, Default)]
pub struct BlockScan<'a> {
	/// Matches in numbering order: all `json` blocks, then all `ts` blocks.
	pub matches: Vec<MatchedBlock<'a>>,
	/// Blocks that failed to parse in lenient mode.
	pub skipped: Vec<SkippedBlock<'a>>,
}

/// Extract and parse every block in `content` and collect the ones addressed
/// to `renderer_id`.
///
/// All matching descriptors are gathered first and numbered afterwards in a
/// single pass, so indices depend only on tag precedence and order of
/// appearance within each tag.
pub fn scan_blocks<'a>(
	content: &'a str,
	renderer_id: &str,
	options: &TransformOptions,
) -> DynblockResult<BlockScan<'a>> {
	scan_tags(content, options.tags(), renderer_id, options)
}

/// Like [`scan_blocks`] but restricted to blocks opened with `tag`. Numbering
/// starts at zero within that tag.
pub fn scan_tag_blocks<'a>(
	content: &'a str,
	tag: SyntaxTag,
	renderer_id: &str,
	options: &TransformOptions,
) -> DynblockResult<BlockScan<'a>> {
	let tags = options.tags().filter(|enabled| *enabled == tag);
	scan_tags(content, tags, renderer_id, options)
}

fn scan_tags<'a>(
	content: &'a str,
	tags: impl Iterator<Item = SyntaxTag>,
	renderer_id: &str,
	options: &TransformOptions,
) -> DynblockResult<BlockScan<'a>> {
	let mut found: Vec<(RawBlock<'a>, ComponentDescriptor)> = Vec::new();
	let mut skipped = Vec::new();

	for tag in tags {
		for block in extract_blocks(content, tag) {
			match parse_block(&block) {
				Ok(descriptor) if descriptor.matches(renderer_id) => {
					found.push((block, descriptor));
				}
				Ok(_) => {}
				Err(error) if !options.strict && error.is_block_error() => {
					tracing::warn!(
						%tag,
						line = block.position.start.line,
						%error,
						"skipping block that failed to parse"
					);
					skipped.push(SkippedBlock { block, error });
				}
				Err(error) => return Err(error),
			}
		}
	}

	let matches: Vec<MatchedBlock<'a>> = drop_overlapping(found)
		.into_iter()
		.enumerate()
		.map(|(index, (block, descriptor))| {
			MatchedBlock {
				index,
				block,
				descriptor,
			}
		})
		.collect();

	tracing::debug!(renderer_id, matches = matches.len(), "scanned content");

	Ok(BlockScan { matches, skipped })
}

/// A `ts` block can start inside the body of a `json` block. Only the first
/// of two overlapping blocks (in numbering order) is kept and numbered, in
/// either substitution mode.
fn drop_overlapping(
	found: Vec<(RawBlock<'_>, ComponentDescriptor)>,
) -> Vec<(RawBlock<'_>, ComponentDescriptor)> {
	let mut kept: Vec<(RawBlock<'_>, ComponentDescriptor)> = Vec::with_capacity(found.len());

	for (block, descriptor) in found {
		if kept
			.iter()
			.any(|(other, _)| other.position.overlaps(&block.position))
		{
			tracing::debug!(
				line = block.position.start.line,
				"dropping block nested inside another matched block"
			);
			continue;
		}

		kept.push((block, descriptor));
	}

	kept
}

/// Replace the matched blocks of `scan` with their anchor markup.
pub fn substitute_matches(
	content: &str,
	scan: &BlockScan<'_>,
	mode: SubstitutionMode,
) -> (String, Vec<TransformDiagnostic>) {
	let mut result = content.to_string();
	let mut diagnostics = Vec::new();

	match mode {
		SubstitutionMode::Text => {
			for matched in &scan.matches {
				let anchor = matched.anchor_id();
				if result.contains(matched.block.text) {
					result = result.replace(matched.block.text, &anchor.markup());
				} else {
					tracing::warn!(
						anchor_id = %anchor,
						line = matched.block.position.start.line,
						"block text was already replaced by an earlier anchor"
					);
					diagnostics.push(TransformDiagnostic::CollapsedDuplicate {
						anchor_id: anchor,
						line: matched.block.position.start.line,
						column: matched.block.position.start.column,
					});
				}
			}
		}
		SubstitutionMode::Position => {
			// Splice from the last block backwards so earlier offsets stay
			// valid.
			let mut ordered: Vec<&MatchedBlock<'_>> = scan.matches.iter().collect();
			ordered.sort_by(|a, b| {
				b.block
					.position
					.start
					.offset
					.cmp(&a.block.position.start.offset)
			});

			for matched in ordered {
				result.replace_range(matched.block.position.range(), &matched.anchor_id().markup());
			}
		}
	}

	(result, diagnostics)
}

/// Replace every block addressed to `renderer_id` with its anchor markup.
///
/// Blocks that parse but are addressed elsewhere are left untouched. The
/// input is never modified; a new string is returned.
pub fn substitute(
	content: &str,
	renderer_id: &str,
	options: &TransformOptions,
) -> DynblockResult<String> {
	let scan = scan_blocks(content, renderer_id, options)?;
	let (result, _) = substitute_matches(content, &scan, options.substitution);
	Ok(result)
}

/// [`substitute`] for the blocks of a single `tag`.
pub fn substitute_tag(
	content: &str,
	tag: SyntaxTag,
	renderer_id: &str,
	options: &TransformOptions,
) -> DynblockResult<String> {
	let scan = scan_tag_blocks(content, tag, renderer_id, options)?;
	let (result, _) = substitute_matches(content, &scan, options.substitution);
	Ok(result)
}

/// Build the ordered bindings for every block addressed to the definition.
/// Numbering restarts at zero on every call.
pub fn build_bindings<R: 'static>(
	content: &str,
	definition: &ComponentDefinition<R>,
	options: &TransformOptions,
) -> DynblockResult<Vec<ComponentBinding<R>>> {
	let scan = scan_blocks(content, definition.id(), options)?;
	Ok(bindings_for_matches(&scan, definition))
}

/// [`build_bindings`] for the blocks of a single `tag`.
pub fn build_tag_bindings<R: 'static>(
	content: &str,
	tag: SyntaxTag,
	definition: &ComponentDefinition<R>,
	options: &TransformOptions,
) -> DynblockResult<Vec<ComponentBinding<R>>> {
	let scan = scan_tag_blocks(content, tag, definition.id(), options)?;
	Ok(bindings_for_matches(&scan, definition))
}

/// Pair each match in `scan` with a factory for `definition`'s component.
pub fn bindings_for_matches<R: 'static>(
	scan: &BlockScan<'_>,
	definition: &ComponentDefinition<R>,
) -> Vec<ComponentBinding<R>> {
	scan.matches
		.iter()
		.map(|matched| definition.bind(matched.anchor_id(), matched.descriptor.props.clone()))
		.collect()
}

/// The constructor invoked to build a render output from block props.
pub type ComponentFn<R> = Arc<dyn Fn(&Props) -> R + Send + Sync>;

/// A deferred render output.
pub type Factory<R> = Box<dyn Fn() -> R + Send + Sync>;

/// A renderer identity supplied by the caller: the id blocks address and the
/// component that renders them.
pub struct ComponentDefinition<R> {
	id: String,
	component: ComponentFn<R>,
}

impl<R: 'static> ComponentDefinition<R> {
	pub fn new(
		id: impl Into<String>,
		component: impl Fn(&Props) -> R + Send + Sync + 'static,
	) -> Self {
		Self {
			id: id.into(),
			component: Arc::new(component),
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	/// Render the component directly.
	pub fn render(&self, props: &Props) -> R {
		(self.component)(props)
	}

	/// Create a binding that renders this component with `props` when asked.
	pub fn bind(&self, anchor_id: AnchorId, props: Props) -> ComponentBinding<R> {
		let component = Arc::clone(&self.component);
		ComponentBinding {
			anchor_id,
			factory: Box::new(move || component(&props)),
		}
	}
}

impl<R> Clone for ComponentDefinition<R> {
	fn clone(&self) -> Self {
		Self {
			id: self.id.clone(),
			component: Arc::clone(&self.component),
		}
	}
}

impl<R> std::fmt::Debug for ComponentDefinition<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ComponentDefinition")
			.field("id", &self.id)
			.finish_non_exhaustive()
	}
}

/// Pairs an anchor with the factory that renders the component mounted there.
pub struct ComponentBinding<R> {
	anchor_id: AnchorId,
	factory: Factory<R>,
}

impl<R> ComponentBinding<R> {
	pub fn anchor_id(&self) -> &AnchorId {
		&self.anchor_id
	}

	/// Construct the render output. Each call builds a fresh output.
	pub fn render(&self) -> R {
		(self.factory)()
	}

	pub fn into_parts(self) -> (AnchorId, Factory<R>) {
		(self.anchor_id, self.factory)
	}
}

impl<R> std::fmt::Debug for ComponentBinding<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ComponentBinding")
			.field("anchor_id", &self.anchor_id)
			.finish_non_exhaustive()
	}
}
