//! A non-executing reader for `ts` blocks.
//!
//! Authors write a `ts` block as ordinary declarations:
//!
//! ```ts
//! const props = { title: `Quarterly <b>numbers</b>` };
//! const spec = { type: "dynamicRenderer", id: "chart", props };
//! ```
//!
//! Only literal data is understood: objects, arrays, strings (including
//! multi-line backtick strings without interpolation), numbers, booleans,
//! `null`/`undefined`, and references to names declared earlier in the same
//! block. Nothing is evaluated, so a block can never run code or loop forever.

use std::collections::HashMap;
use std::ops::Range;

use logos::Logos;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;

/// Raw tokens produced by logos for the literal subset.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
	#[token("//", line_comment)]
	LineComment,
	#[token("/*", block_comment)]
	BlockComment,
	#[token("export")]
	Export,
	#[token("const")]
	Const,
	#[token("let")]
	Let,
	#[token("var")]
	Var,
	#[token("true")]
	True,
	#[token("false")]
	False,
	#[token("null")]
	Null,
	#[token("undefined")]
	Undefined,
	#[token("{")]
	BraceOpen,
	#[token("}")]
	BraceClose,
	#[token("[")]
	BracketOpen,
	#[token("]")]
	BracketClose,
	#[token("(")]
	ParenOpen,
	#[token(")")]
	ParenClose,
	#[token(":")]
	Colon,
	#[token(",")]
	Comma,
	#[token(";")]
	Semicolon,
	#[token("=")]
	Equals,
	#[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
	Ident,
	#[regex(r#""([^"\\]|\\(.|\r?\n))*""#)]
	DoubleQuotedString,
	#[regex(r"'([^'\\]|\\(.|\r?\n))*'")]
	SingleQuotedString,
	#[regex(r"`([^`\\]|\\(.|\r?\n))*`")]
	TemplateString,
	#[regex(r"-?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?")]
	Number,
}

impl RawToken {
	fn is_comment(self) -> bool {
		matches!(self, Self::LineComment | Self::BlockComment)
	}

	/// Keywords are still valid property names (`{ const: 1 }`).
	fn is_keyword(self) -> bool {
		matches!(
			self,
			Self::Export
				| Self::Const
				| Self::Let
				| Self::Var
				| Self::True
				| Self::False
				| Self::Null
				| Self::Undefined
		)
	}
}

fn line_comment(lex: &mut logos::Lexer<'_, RawToken>) {
	let remainder = lex.remainder();
	let length = remainder.find('\n').unwrap_or(remainder.len());
	lex.bump(length);
}

fn block_comment(lex: &mut logos::Lexer<'_, RawToken>) -> bool {
	match lex.remainder().find("*/") {
		Some(index) => {
			lex.bump(index + 2);
			true
		}
		None => false,
	}
}

/// A failure while reading a `ts` block. `offset` is a byte offset into the
/// block body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
	pub message: String,
	pub offset: usize,
}

impl ScriptError {
	fn new(message: impl Into<String>, offset: usize) -> Self {
		Self {
			message: message.into(),
			offset,
		}
	}
}

impl std::fmt::Display for ScriptError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.message)
	}
}

/// Read every declaration in `source` and return the declared names with
/// their values. Later declarations of the same name replace earlier ones.
pub fn read_declarations(source: &str) -> Result<HashMap<String, Value>, ScriptError> {
	let mut reader = LiteralReader::new(source)?;
	reader.read_program()?;
	Ok(reader.bindings)
}

/// Read `source` and return the value bound to `name`, if any.
pub fn read_binding(source: &str, name: &str) -> Result<Option<Value>, ScriptError> {
	let mut bindings = read_declarations(source)?;
	Ok(bindings.remove(name))
}

/// Deepest nesting of objects, arrays and parentheses a `ts` block may use.
/// Matches the recursion limit `serde_json` applies to `json` blocks.
const MAX_DEPTH: usize = 128;

/// Walks the token stream produced by logos with a small recursive descent
/// reader.
struct LiteralReader<'a> {
	/// The body of the `ts` block.
	source: &'a str,
	/// The non-comment tokens and their byte spans.
	tokens: Vec<(RawToken, Range<usize>)>,
	/// Current index into `tokens`.
	cursor: usize,
	/// Names declared so far.
	bindings: HashMap<String, Value>,
	/// Open `{`, `[` and `(` around the value being read.
	depth: usize,
}

impl<'a> LiteralReader<'a> {
	fn new(source: &'a str) -> Result<Self, ScriptError> {
		let mut tokens = Vec::new();

		for (result, span) in RawToken::lexer(source).spanned() {
			match result {
				Ok(token) if token.is_comment() => {}
				Ok(token) => tokens.push((token, span)),
				Err(()) => {
					let text = &source[span.clone()];
					let message = if text.starts_with("/*") {
						"unterminated block comment".to_string()
					} else {
						format!("unexpected character `{text}`")
					};
					return Err(ScriptError::new(message, span.start));
				}
			}
		}

		Ok(Self {
			source,
			tokens,
			cursor: 0,
			bindings: HashMap::new(),
			depth: 0,
		})
	}

	fn peek(&self) -> Option<RawToken> {
		self.tokens.get(self.cursor).map(|(token, _)| *token)
	}

	fn advance(&mut self) -> Option<(RawToken, Range<usize>)> {
		let item = self.tokens.get(self.cursor).cloned();
		if item.is_some() {
			self.cursor += 1;
		}
		item
	}

	/// Take the next token, failing with "expected {expected}" at the end of
	/// input.
	fn expect_any(&mut self, expected: &str) -> Result<(RawToken, Range<usize>), ScriptError> {
		self.advance().ok_or_else(|| {
			ScriptError::new(
				format!("expected {expected}, found end of block"),
				self.source.len(),
			)
		})
	}

	fn expect(&mut self, wanted: RawToken, expected: &str) -> Result<Range<usize>, ScriptError> {
		let (token, span) = self.expect_any(expected)?;
		if token == wanted {
			Ok(span)
		} else {
			Err(self.unexpected(&span, expected))
		}
	}

	fn unexpected(&self, span: &Range<usize>, expected: &str) -> ScriptError {
		ScriptError::new(
			format!("expected {expected}, found `{}`", &self.source[span.clone()]),
			span.start,
		)
	}

	fn slice(&self, span: &Range<usize>) -> &'a str {
		&self.source[span.clone()]
	}

	fn read_program(&mut self) -> Result<(), ScriptError> {
		while let Some(token) = self.peek() {
			if token == RawToken::Semicolon {
				self.advance();
				continue;
			}

			self.read_declaration()?;
		}

		Ok(())
	}

	/// `export? (const|let|var)? name = value ;?`
	fn read_declaration(&mut self) -> Result<(), ScriptError> {
		if self.peek() == Some(RawToken::Export) {
			self.advance();
		}

		if matches!(
			self.peek(),
			Some(RawToken::Const | RawToken::Let | RawToken::Var)
		) {
			self.advance();
		}

		let span = self.expect(RawToken::Ident, "a declaration name")?;
		let name = self.slice(&span).to_string();
		self.expect(RawToken::Equals, "`=`")?;
		let value = self.read_value()?;

		if self.peek() == Some(RawToken::Semicolon) {
			self.advance();
		}

		self.bindings.insert(name, value);
		Ok(())
	}

	fn read_value(&mut self) -> Result<Value, ScriptError> {
		let (token, span) = self.expect_any("a value")?;

		match token {
			RawToken::BraceOpen => self.nested(&span, Self::read_object),
			RawToken::BracketOpen => self.nested(&span, Self::read_array),
			RawToken::ParenOpen => {
				self.nested(&span, |reader| {
					let value = reader.read_value()?;
					reader.expect(RawToken::ParenClose, "`)`")?;
					Ok(value)
				})
			}
			RawToken::DoubleQuotedString
			| RawToken::SingleQuotedString
			| RawToken::TemplateString => self.read_string(token, &span).map(Value::String),
			RawToken::Number => self.read_number(&span),
			RawToken::True => Ok(Value::Bool(true)),
			RawToken::False => Ok(Value::Bool(false)),
			RawToken::Null | RawToken::Undefined => Ok(Value::Null),
			RawToken::Ident => self.lookup(&span),
			_ => Err(self.unexpected(&span, "a value")),
		}
	}

	/// Run `read` one level deeper, failing at `span` once `MAX_DEPTH` is
	/// exceeded.
	fn nested(
		&mut self,
		span: &Range<usize>,
		read: impl FnOnce(&mut Self) -> Result<Value, ScriptError>,
	) -> Result<Value, ScriptError> {
		if self.depth >= MAX_DEPTH {
			return Err(ScriptError::new("nesting too deep", span.start));
		}

		self.depth += 1;
		let value = read(self);
		self.depth -= 1;
		value
	}

	/// Resolve a reference to an earlier declaration.
	fn lookup(&self, span: &Range<usize>) -> Result<Value, ScriptError> {
		let name = self.slice(span);
		self.bindings.get(name).cloned().ok_or_else(|| {
			ScriptError::new(
				format!("`{name}` is not defined; only earlier declarations can be referenced"),
				span.start,
			)
		})
	}

	/// Called after the opening `{`.
	fn read_object(&mut self) -> Result<Value, ScriptError> {
		let mut map = Map::new();

		loop {
			if self.peek() == Some(RawToken::BraceClose) {
				self.advance();
				break;
			}

			let (token, span) = self.expect_any("a property name or `}`")?;
			let key = match token {
				RawToken::Ident | RawToken::Number => self.slice(&span).to_string(),
				RawToken::DoubleQuotedString | RawToken::SingleQuotedString => {
					self.read_string(token, &span)?
				}
				token if token.is_keyword() => self.slice(&span).to_string(),
				_ => return Err(self.unexpected(&span, "a property name or `}`")),
			};

			let value = if self.peek() == Some(RawToken::Colon) {
				self.advance();
				self.read_value()?
			} else if token == RawToken::Ident {
				// Shorthand property: `{ props }`.
				self.lookup(&span)?
			} else {
				let (_, next) = self.expect_any("`:`")?;
				return Err(self.unexpected(&next, "`:`"));
			};

			map.insert(key, value);

			let (token, span) = self.expect_any("`,` or `}`")?;
			match token {
				RawToken::Comma => {}
				RawToken::BraceClose => break,
				_ => return Err(self.unexpected(&span, "`,` or `}`")),
			}
		}

		Ok(Value::Object(map))
	}

	/// Called after the opening `[`.
	fn read_array(&mut self) -> Result<Value, ScriptError> {
		let mut items = Vec::new();

		loop {
			if self.peek() == Some(RawToken::BracketClose) {
				self.advance();
				break;
			}

			items.push(self.read_value()?);

			let (token, span) = self.expect_any("`,` or `]`")?;
			match token {
				RawToken::Comma => {}
				RawToken::BracketClose => break,
				_ => return Err(self.unexpected(&span, "`,` or `]`")),
			}
		}

		Ok(Value::Array(items))
	}

	fn read_string(&self, token: RawToken, span: &Range<usize>) -> Result<String, ScriptError> {
		let slice = self.slice(span);
		// Strip surrounding quotes
		let inner = &slice[1..slice.len() - 1];
		let template = token == RawToken::TemplateString;

		unescape(inner, template)
			.map_err(|(message, offset)| ScriptError::new(message, span.start + 1 + offset))
	}

	fn read_number(&self, span: &Range<usize>) -> Result<Value, ScriptError> {
		let slice = self.slice(span);
		let is_float = slice.contains('.') || slice.contains('e') || slice.contains('E');

		if !is_float {
			if let Ok(value) = slice.parse::<i64>() {
				return Ok(Value::from(value));
			}
		}

		slice
			.parse::<f64>()
			.ok()
			.and_then(Number::from_f64)
			.map(Value::Number)
			.ok_or_else(|| ScriptError::new(format!("invalid number `{slice}`"), span.start))
	}
}

/// Decode the escape sequences of a quoted string body. Errors carry a byte
/// offset into `raw`.
fn unescape(raw: &str, template: bool) -> Result<String, (String, usize)> {
	let mut result = String::with_capacity(raw.len());
	let mut chars = raw.char_indices().peekable();

	while let Some((index, ch)) = chars.next() {
		match ch {
			'\\' => {
				let Some((_, escaped)) = chars.next() else {
					return Err(("unterminated escape sequence".to_string(), index));
				};

				match escaped {
					'n' => result.push('\n'),
					'r' => result.push('\r'),
					't' => result.push('\t'),
					'b' => result.push('\u{8}'),
					'f' => result.push('\u{c}'),
					'v' => result.push('\u{b}'),
					'0' => result.push('\0'),
					// Line continuation.
					'\n' => {}
					'\r' => {
						if chars.peek().is_some_and(|(_, next)| *next == '\n') {
							chars.next();
						}
					}
					'x' => {
						let code = take_hex(&mut chars, 2).ok_or_else(|| {
							("invalid `\\x` escape sequence".to_string(), index)
						})?;
						result.push(code);
					}
					'u' => {
						let code = if chars.peek().is_some_and(|(_, next)| *next == '{') {
							chars.next();
							let mut digits = String::new();
							loop {
								match chars.next() {
									Some((_, '}')) => break,
									Some((_, digit)) if digit.is_ascii_hexdigit() => {
										digits.push(digit);
									}
									_ => {
										return Err((
											"invalid `\\u{...}` escape sequence".to_string(),
											index,
										));
									}
								}
							}
							u32::from_str_radix(&digits, 16)
								.ok()
								.and_then(char::from_u32)
						} else {
							take_hex(&mut chars, 4)
						};

						let code = code.ok_or_else(|| {
							("invalid `\\u` escape sequence".to_string(), index)
						})?;
						result.push(code);
					}
					other => result.push(other),
				}
			}
			'$' if template && chars.peek().is_some_and(|(_, next)| *next == '{') => {
				return Err((
					"template interpolation `${...}` is not supported; escape it as `\\${`"
						.to_string(),
					index,
				));
			}
			other => result.push(other),
		}
	}

	Ok(result)
}

fn take_hex(
	chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
	count: usize,
) -> Option<char> {
	let mut digits = String::with_capacity(count);
	for _ in 0..count {
		let (_, digit) = chars.next()?;
		if !digit.is_ascii_hexdigit() {
			return None;
		}
		digits.push(digit);
	}

	u32::from_str_radix(&digits, 16)
		.ok()
		.and_then(char::from_u32)
}

#[cfg(test)]
mod tests {
	use rstest::rstest;
	use serde_json::json;
	use similar_asserts::assert_eq;

	use super::*;

	#[test]
	fn reads_const_declaration() -> Result<(), ScriptError> {
		let value = read_binding(
			r#"const spec = { type: "dynamicRenderer", id: "chart", props: { count: 3 } };"#,
			"spec",
		)?;
		assert_eq!(
			value,
			Some(json!({ "type": "dynamicRenderer", "id": "chart", "props": { "count": 3 } }))
		);

		Ok(())
	}

	#[test]
	fn resolves_earlier_declarations_and_shorthand() -> Result<(), ScriptError> {
		let source = "const title = 'Sales';\nlet props = { title, rows: [1, 2.5, -3] };\nexport \
		              const spec = { type: 'dynamicRenderer', id: 'table', props }";
		let value = read_binding(source, "spec")?;
		assert_eq!(
			value,
			Some(json!({
				"type": "dynamicRenderer",
				"id": "table",
				"props": { "title": "Sales", "rows": [1, 2.5, -3] }
			}))
		);

		Ok(())
	}

	#[test]
	fn template_strings_keep_markup_verbatim() -> Result<(), ScriptError> {
		let source = "const spec = { html: `<p class=\"lead\">It's\n<b>bold</b></p>` };";
		let value = read_binding(source, "spec")?;
		assert_eq!(
			value,
			Some(json!({ "html": "<p class=\"lead\">It's\n<b>bold</b></p>" }))
		);

		Ok(())
	}

	#[test]
	fn ignores_comments_and_trailing_commas() -> Result<(), ScriptError> {
		let source = "// heading\nconst spec = {\n  /* the id */ id: \"x\",\n  list: [true, false, \
		              null, undefined,],\n};";
		let value = read_binding(source, "spec")?;
		assert_eq!(
			value,
			Some(json!({ "id": "x", "list": [true, false, null, null] }))
		);

		Ok(())
	}

	#[test]
	fn keywords_and_strings_are_valid_keys() -> Result<(), ScriptError> {
		let value = read_binding(r#"spec = { const: 1, "data-id": 'a', 2: "two" }"#, "spec")?;
		assert_eq!(value, Some(json!({ "const": 1, "data-id": "a", "2": "two" })));

		Ok(())
	}

	#[rstest]
	#[case::newline(r"a\nb", "a\nb")]
	#[case::quote(r#"say \"hi\""#, "say \"hi\"")]
	#[case::hex(r"\x41", "A")]
	#[case::unicode(r"\u0042", "B")]
	#[case::unicode_braces(r"\u{1F600}", "\u{1F600}")]
	#[case::line_continuation("a\\\nb", "ab")]
	#[case::crlf_line_continuation("a\\\r\nb", "ab")]
	#[case::dollar(r"\${x}", "${x}")]
	#[case::unknown(r"\q", "q")]
	fn unescapes_sequences(#[case] raw: &str, #[case] expected: &str) {
		assert_eq!(unescape(raw, true), Ok(expected.to_string()));
	}

	#[test]
	fn missing_binding_is_none() -> Result<(), ScriptError> {
		assert_eq!(read_binding("const other = 1;", "spec")?, None);

		Ok(())
	}

	#[rstest]
	#[case::interpolation("const spec = `${window.alert(1)}`;", "interpolation")]
	#[case::call("const spec = fetch(\"x\");", "not defined")]
	#[case::undefined_reference("const spec = { props };", "not defined")]
	#[case::arrow("const spec = () => 1;", "expected")]
	#[case::operator("const spec = 1 + 2;", "unexpected character `+`")]
	#[case::unterminated_object("const spec = { id: \"x\"", "end of block")]
	#[case::unterminated_comment("/* never closed", "unterminated block comment")]
	#[case::missing_colon("const spec = { \"id\" \"x\" };", "expected `:`")]
	#[case::too_deep(
		&format!("const spec = {}1{};", "[".repeat(200_000), "]".repeat(200_000)),
		"nesting too deep"
	)]
	fn rejects_anything_but_literals(#[case] source: &str, #[case] message: &str) {
		let error = read_declarations(source).expect_err("should fail");
		assert!(
			error.message.contains(message),
			"`{}` should contain `{message}`",
			error.message
		);
	}

	#[rstest]
	#[case::double_quoted("const spec = \"one \\\ntwo\";")]
	#[case::single_quoted("const spec = 'one \\\r\ntwo';")]
	#[case::template("const spec = `one \\\ntwo`;")]
	fn strings_continue_across_escaped_newlines(#[case] source: &str) -> Result<(), ScriptError> {
		assert_eq!(read_binding(source, "spec")?, Some(json!("one two")));

		Ok(())
	}

	#[test]
	fn nesting_up_to_the_limit_is_read() -> Result<(), ScriptError> {
		let source = format!(
			"const spec = {}1{};",
			"[".repeat(MAX_DEPTH),
			"]".repeat(MAX_DEPTH)
		);
		assert!(read_binding(&source, "spec")?.is_some());

		let source = format!(
			"const spec = {}1{};",
			"(".repeat(MAX_DEPTH + 1),
			")".repeat(MAX_DEPTH + 1)
		);
		let error = read_declarations(&source).expect_err("should fail");
		assert_eq!(error.message, "nesting too deep");
		assert_eq!(error.offset, "const spec = ".len() + MAX_DEPTH);

		Ok(())
	}

	#[test]
	fn error_offset_points_at_the_problem() {
		let source = "const spec = { id: oops };";
		let error = read_declarations(source).expect_err("should fail");
		assert_eq!(&source[error.offset..error.offset + 4], "oops");
	}
}
