use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::DynblockError;
use crate::DynblockResult;
use crate::Point;
use crate::RawBlock;
use crate::SyntaxTag;
use crate::script::read_binding;

/// The descriptor `type` that marks a block as a dynamic component.
pub const DYNAMIC_RENDERER_KIND: &str = "dynamicRenderer";

/// The name a `ts` block must bind its descriptor to.
pub const SCRIPT_SPEC_BINDING: &str = "spec";

/// Properties handed to a component when its binding is rendered.
pub type Props = Map<String, Value>;

/// The structured result of parsing one fenced block.
///
/// `kind` is read from the block's `type` field. Values that are missing or
/// not strings leave `kind` and `id` empty, so the descriptor matches no
/// renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComponentDescriptor {
	/// The block's `type`, e.g. `dynamicRenderer`.
	pub kind: String,
	/// The renderer identity the block is addressed to.
	pub id: String,
	/// Properties passed to the component. Empty when absent.
	pub props: Props,
}

impl ComponentDescriptor {
	/// Build a descriptor from a parsed value.
	pub fn from_value(value: Value) -> Self {
		let Value::Object(mut object) = value else {
			return Self::default();
		};

		let kind = take_string(&mut object, "type");
		let id = take_string(&mut object, "id");
		let props = match object.remove("props") {
			None | Some(Value::Null) => Props::new(),
			Some(Value::Object(props)) => props,
			Some(other) => {
				tracing::warn!(%id, props = %other, "ignoring `props` that is not an object");
				Props::new()
			}
		};

		Self { kind, id, props }
	}

	/// Whether this descriptor is a dynamic component.
	pub fn is_dynamic(&self) -> bool {
		self.kind == DYNAMIC_RENDERER_KIND
	}

	/// Whether this descriptor is a dynamic component addressed to
	/// `renderer_id`.
	pub fn matches(&self, renderer_id: &str) -> bool {
		self.is_dynamic() && self.id == renderer_id
	}
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> String {
	match object.remove(key) {
		Some(Value::String(value)) => value,
		_ => String::new(),
	}
}

/// Parse a fenced block into a [`ComponentDescriptor`] using the strategy
/// selected by its tag.
pub fn parse_block(block: &RawBlock<'_>) -> DynblockResult<ComponentDescriptor> {
	match block.tag {
		SyntaxTag::Data => parse_data_block(block),
		SyntaxTag::Script => parse_script_block(block),
	}
}

fn parse_data_block(block: &RawBlock<'_>) -> DynblockResult<ComponentDescriptor> {
	let value: Value = serde_json::from_str(block.body).map_err(|error| {
		let (line, column) = if error.line() == 0 {
			(block.body_start.line, block.body_start.column)
		} else {
			block.body_start.relative(error.line(), error.column())
		};

		DynblockError::InvalidDataBlock {
			message: error.to_string(),
			line,
			column,
		}
	})?;

	Ok(ComponentDescriptor::from_value(value))
}

fn parse_script_block(block: &RawBlock<'_>) -> DynblockResult<ComponentDescriptor> {
	let value = read_binding(block.body, SCRIPT_SPEC_BINDING).map_err(|error| {
		let point = locate(block.body_start, block.body, error.offset);
		DynblockError::InvalidScriptBlock {
			message: error.message,
			line: point.line,
			column: point.column,
		}
	})?;

	let Some(value) = value else {
		return Err(DynblockError::MissingSpec {
			line: block.position.start.line,
			column: block.position.start.column,
		});
	};

	Ok(ComponentDescriptor::from_value(value))
}

/// Absolute location of byte `offset` inside a block body.
fn locate(body_start: Point, body: &str, offset: usize) -> Point {
	let mut point = body_start;
	let offset = offset.min(body.len());
	if let Some(prefix) = body.get(..offset) {
		point.advance_str(prefix);
	}
	point
}
