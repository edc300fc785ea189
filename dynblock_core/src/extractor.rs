use serde::Deserialize;
use serde::Serialize;

use crate::Point;
use crate::Position;

/// The fence marker shared by opening and closing fences.
pub const FENCE: &str = "```";

/// The fence-language marker that selects how a block is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SyntaxTag {
	/// A ```` ```json ```` block holding a JSON object.
	#[serde(rename = "json")]
	Data,
	/// A ```` ```ts ```` block holding literal declarations that bind `spec`.
	#[serde(rename = "ts")]
	Script,
}

impl SyntaxTag {
	/// The order in which tags are scanned. All `Data` blocks are numbered
	/// before any `Script` block, regardless of where they sit in the text.
	pub const PRECEDENCE: [SyntaxTag; 2] = [SyntaxTag::Data, SyntaxTag::Script];

	/// The info string that must immediately follow the opening fence.
	pub const fn marker(self) -> &'static str {
		match self {
			Self::Data => "json",
			Self::Script => "ts",
		}
	}
}

impl std::fmt::Display for SyntaxTag {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.marker())
	}
}

/// A fenced block captured verbatim from the source content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBlock<'a> {
	/// The syntax the block was opened with.
	pub tag: SyntaxTag,
	/// The full fenced text, from the opening backticks to the closing ones.
	pub text: &'a str,
	/// The text between the fences, without the newline before the closer.
	pub body: &'a str,
	/// Span of [`text`](RawBlock::text) in the source.
	pub position: Position,
	/// Location of the first byte of [`body`](RawBlock::body).
	pub body_start: Point,
}

/// Find every fenced block opened with `tag`, in order of appearance.
///
/// An opening fence is a line starting with ```` ``` ```` immediately followed
/// by the tag marker and nothing else but trailing whitespace. The block ends
/// at the nearest following line holding only ```` ``` ````. An opening fence
/// that is never closed does not produce a block.
pub fn extract_blocks(content: &str, tag: SyntaxTag) -> Vec<RawBlock<'_>> {
	let mut blocks = Vec::new();
	let mut lines = Lines::new(content);

	while let Some(opening) = lines.next() {
		if !is_opening_fence(opening.text, tag) {
			continue;
		}

		let Some(closing) = lines.by_ref().find(|line| is_closing_fence(line.text)) else {
			tracing::debug!(
				line = opening.start.line,
				%tag,
				"ignoring fence that is never closed"
			);
			break;
		};

		let mut end = closing.start;
		end.advance_str(FENCE);

		let body_start = opening.next;
		let body = trim_line_ending(&content[body_start.offset..closing.start.offset]);

		blocks.push(RawBlock {
			tag,
			text: &content[opening.start.offset..end.offset],
			body,
			position: Position {
				start: opening.start,
				end,
			},
			body_start,
		});
	}

	blocks
}

fn is_opening_fence(line: &str, tag: SyntaxTag) -> bool {
	line.strip_prefix(FENCE)
		.and_then(|rest| rest.strip_prefix(tag.marker()))
		.is_some_and(|rest| rest.trim().is_empty())
}

fn is_closing_fence(line: &str) -> bool {
	line.strip_prefix(FENCE)
		.is_some_and(|rest| rest.trim().is_empty())
}

fn trim_line_ending(text: &str) -> &str {
	let text = text.strip_suffix('\n').unwrap_or(text);
	text.strip_suffix('\r').unwrap_or(text)
}

/// One line of the source with its location.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
	/// The line without its `\n`.
	text: &'a str,
	/// Location of the first character of the line.
	start: Point,
	/// Location of the first character of the following line.
	next: Point,
}

/// Walks the source line by line, keeping track of line, column and offset.
struct Lines<'a> {
	content: &'a str,
	point: Point,
}

impl<'a> Lines<'a> {
	fn new(content: &'a str) -> Self {
		Self {
			content,
			point: Point::default(),
		}
	}
}

impl<'a> Iterator for Lines<'a> {
	type Item = Line<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		let rest = &self.content[self.point.offset..];
		if rest.is_empty() {
			return None;
		}

		let raw = rest.find('\n').map_or(rest, |index| &rest[..=index]);
		let start = self.point;
		self.point.advance_str(raw);

		Some(Line {
			text: raw.strip_suffix('\n').unwrap_or(raw),
			start,
			next: self.point,
		})
	}
}
