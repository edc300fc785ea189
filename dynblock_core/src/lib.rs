//! `dynblock_core` turns fenced component blocks embedded in prose into anchor
//! placeholders plus an ordered list of bindings that know how to render the
//! component for each placeholder.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Content
//!   -> Extractor (finds ```json and ```ts fenced blocks, line by line)
//!   -> Parser (JSON, or the literal-only script reader, into descriptors)
//!   -> Scan (keeps `dynamicRenderer` descriptors for one id and numbers them)
//!   -> Substitution (swaps each match for `<div id="{id}-{index}"></div>`)
//!   -> Bindings (pairs each anchor id with a lazy component factory)
//! ```
//!
//! Several component definitions are applied one after another by
//! [`transform`], each seeing the content left by the previous one.
//!
//! ## Block Syntax
//!
//! ````markdown
//! ```json
//! { "type": "dynamicRenderer", "id": "chart", "props": { "title": "Sales" } }
//! ```
//!
//! ```ts
//! const spec = { type: "dynamicRenderer", id: "chart", props: { title: "Costs" } };
//! ```
//! ````
//!
//! `json` blocks are always numbered before `ts` blocks, so the content above
//! yields anchors `chart-0` (Sales) and `chart-1` (Costs).
//!
//! ## Quick Start
//!
//! ```rust
//! use dynblock_core::ComponentDefinition;
//! use dynblock_core::transform_content;
//!
//! let content = "```json\n{\"type\":\"dynamicRenderer\",\"id\":\"chart\"}\n```";
//! let chart = ComponentDefinition::new("chart", |props| props.len());
//! let result = transform_content(content, vec![chart]).unwrap();
//!
//! assert_eq!(result.transformed_content, "<div id=\"chart-0\"></div>");
//! assert_eq!(result.bindings[0].anchor_id().as_str(), "chart-0");
//! assert_eq!(result.bindings[0].render(), 0);
//! ```

pub use config::*;
pub use engine::*;
pub use error::*;
pub use extractor::*;
pub use parser::*;
pub use pipeline::*;
pub use position::*;

pub mod config;
mod engine;
#[allow(unused_assignments)]
mod error;
mod extractor;
mod parser;
mod pipeline;
mod position;
pub mod script;

#[cfg(test)]
mod __fixtures;
