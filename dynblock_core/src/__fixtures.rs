use crate::ComponentDefinition;
use crate::Props;

/// What the test components render: the id they were registered under and
/// the props they were given.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
	pub component: String,
	pub props: Props,
}

/// A component that records its props.
pub fn recorder(id: &str) -> ComponentDefinition<Rendered> {
	let component = id.to_string();
	ComponentDefinition::new(id, move |props: &Props| {
		Rendered {
			component: component.clone(),
			props: props.clone(),
		}
	})
}

/// A fenced `json` block addressed to `id`.
pub fn data_block(id: &str) -> String {
	format!("```json\n{{\"type\":\"dynamicRenderer\",\"id\":\"{id}\"}}\n```")
}

/// A fenced `json` block addressed to `id` carrying `props`.
pub fn data_block_with_props(id: &str, props: &str) -> String {
	format!("```json\n{{\"type\":\"dynamicRenderer\",\"id\":\"{id}\",\"props\":{props}}}\n```")
}

/// A fenced `ts` block declaring `spec` for `id` carrying `props`.
pub fn script_block_with_props(id: &str, props: &str) -> String {
	format!("```ts\nconst spec = {{\n\ttype: \"dynamicRenderer\",\n\tid: \"{id}\",\n\tprops: {props},\n}};\n```")
}

pub fn anchor(id: &str, index: usize) -> String {
	format!("<div id=\"{id}-{index}\"></div>")
}

pub fn props(value: serde_json::Value) -> Props {
	match value {
		serde_json::Value::Object(map) => map,
		_ => Props::new(),
	}
}

pub const PROSE_ONLY: &str = "# Release notes\n\nNothing dynamic in here.\n\n```rust\nfn main() {}\n```\n";
