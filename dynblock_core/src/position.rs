use serde::Deserialize;
use serde::Serialize;

/// A single location in a source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
	/// 1-indexed line number.
	pub line: usize,
	/// 1-indexed column number, counted in characters.
	pub column: usize,
	/// 0-indexed byte offset.
	pub offset: usize,
}

impl Point {
	pub const fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}

	/// Move the point forward over `text`.
	pub fn advance_str(&mut self, text: &str) {
		for ch in text.chars() {
			if ch == '\n' {
				self.line += 1;
				self.column = 1;
			} else {
				self.column += 1;
			}
		}

		self.offset += text.len();
	}

	/// Resolve a `line`/`column` pair that is relative to this point (both
	/// 1-indexed) into an absolute location.
	pub fn relative(&self, line: usize, column: usize) -> (usize, usize) {
		if line <= 1 {
			(self.line, self.column + column.saturating_sub(1))
		} else {
			(self.line + line - 1, column)
		}
	}
}

impl Default for Point {
	fn default() -> Self {
		Self::new(1, 1, 0)
	}
}

/// The span covered by a fenced block in its source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
	pub start: Point,
	pub end: Point,
}

impl Position {
	pub const fn new(
		start_line: usize,
		start_column: usize,
		start_offset: usize,
		end_line: usize,
		end_column: usize,
		end_offset: usize,
	) -> Self {
		Self {
			start: Point::new(start_line, start_column, start_offset),
			end: Point::new(end_line, end_column, end_offset),
		}
	}

	/// The byte range of the span.
	pub fn range(&self) -> std::ops::Range<usize> {
		self.start.offset..self.end.offset
	}

	/// Whether two spans share at least one byte.
	pub fn overlaps(&self, other: &Position) -> bool {
		self.start.offset < other.end.offset && other.start.offset < self.end.offset
	}
}
