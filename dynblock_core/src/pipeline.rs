use std::collections::HashSet;

use crate::AnchorId;
use crate::ComponentBinding;
use crate::ComponentDefinition;
use crate::DynblockResult;
use crate::SyntaxTag;
use crate::TransformDiagnostic;
use crate::TransformOptions;
use crate::bindings_for_matches;
use crate::scan_blocks;
use crate::substitute_matches;

/// Everything a transform needs, passed as a single record.
pub struct PipelineInput<R> {
	/// The content to transform.
	pub initial_content: String,
	/// Renderer identities, applied in order.
	pub component_definitions: Vec<ComponentDefinition<R>>,
	pub options: TransformOptions,
}

impl<R> PipelineInput<R> {
	pub fn new(
		initial_content: impl Into<String>,
		component_definitions: Vec<ComponentDefinition<R>>,
	) -> Self {
		Self {
			initial_content: initial_content.into(),
			component_definitions,
			options: TransformOptions::default(),
		}
	}

	#[must_use]
	pub fn with_options(mut self, options: TransformOptions) -> Self {
		self.options = options;
		self
	}
}

impl<R> std::fmt::Debug for PipelineInput<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PipelineInput")
			.field("initial_content", &self.initial_content)
			.field("component_definitions", &self.component_definitions)
			.field("options", &self.options)
			.finish()
	}
}

/// The outcome of running every definition over the content.
pub struct TransformResult<R> {
	/// The content with every matched block replaced by its anchor markup.
	pub transformed_content: String,
	/// Bindings in definition order, then match order within a definition.
	pub bindings: Vec<ComponentBinding<R>>,
	/// Non-fatal problems found along the way.
	pub diagnostics: Vec<TransformDiagnostic>,
}

impl<R> TransformResult<R> {
	/// The anchor ids of every binding, in order.
	pub fn anchor_ids(&self) -> Vec<&AnchorId> {
		self.bindings.iter().map(ComponentBinding::anchor_id).collect()
	}

	pub fn has_diagnostics(&self) -> bool {
		!self.diagnostics.is_empty()
	}
}

impl<R> std::fmt::Debug for TransformResult<R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TransformResult")
			.field("transformed_content", &self.transformed_content)
			.field("bindings", &self.bindings)
			.field("diagnostics", &self.diagnostics)
			.finish()
	}
}

/// Thread the content through every component definition in order.
///
/// Each definition sees the output of the previous one. Bindings from all
/// definitions are concatenated. In strict mode the first unparsable block
/// aborts the whole call and no partial result is returned.
pub fn transform<R: 'static>(input: PipelineInput<R>) -> DynblockResult<TransformResult<R>> {
	let PipelineInput {
		initial_content,
		component_definitions,
		options,
	} = input;

	let mut content = initial_content;
	let mut bindings = Vec::new();
	let mut diagnostics = Vec::new();
	let mut reported: HashSet<(SyntaxTag, String)> = HashSet::new();

	for definition in &component_definitions {
		let scan = scan_blocks(&content, definition.id(), &options)?;

		for skipped in &scan.skipped {
			if reported.insert((skipped.block.tag, skipped.block.text.to_string())) {
				diagnostics.push(skipped.to_diagnostic());
			}
		}

		let step_bindings = bindings_for_matches(&scan, definition);
		let (next, step_diagnostics) = substitute_matches(&content, &scan, options.substitution);

		tracing::debug!(
			component = definition.id(),
			bindings = step_bindings.len(),
			"applied component definition"
		);

		bindings.extend(step_bindings);
		diagnostics.extend(step_diagnostics);
		content = next;
	}

	Ok(TransformResult {
		transformed_content: content,
		bindings,
		diagnostics,
	})
}

/// Run [`transform`] with positional arguments and default options.
pub fn transform_content<R: 'static>(
	content: &str,
	component_definitions: Vec<ComponentDefinition<R>>,
) -> DynblockResult<TransformResult<R>> {
	transform(PipelineInput::new(content, component_definitions))
}

/// The host operation that attaches a render output to the node carrying an
/// anchor id.
pub trait Mount<R> {
	fn mount(&mut self, anchor_id: &AnchorId, output: R);
}

impl<R, F> Mount<R> for F
where
	F: FnMut(&AnchorId, R),
{
	fn mount(&mut self, anchor_id: &AnchorId, output: R) {
		self(anchor_id, output);
	}
}

/// Render every binding and hand it to `mount`, in binding order. Returns the
/// number of mounted outputs.
pub fn mount_bindings<R, M>(bindings: &[ComponentBinding<R>], mount: &mut M) -> usize
where
	M: Mount<R> + ?Sized,
{
	for binding in bindings {
		mount.mount(binding.anchor_id(), binding.render());
	}

	bindings.len()
}
