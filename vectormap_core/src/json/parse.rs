//! A small recursive-descent JSON parser.
//!
//! Stylesheet documents are the only JSON this crate ever reads, so the
//! parser favors clear errors over speed: every failure names the byte
//! position and what was expected there.

use crate::json::{JsonArray, JsonObject, JsonValue};
use anyhow::{Context, Result, anyhow, bail};
use std::collections::BTreeMap;

/// Parse a complete JSON document; trailing non-whitespace is an error.
pub fn parse_json_str(json: &str) -> Result<JsonValue> {
	let mut parser = Parser::new(json.as_bytes());
	let value = parser.parse_value().with_context(|| format!("while parsing JSON ({} bytes)", json.len()))?;
	parser.skip_whitespace();
	if let Some(byte) = parser.peek() {
		bail!("{}", parser.error_at(&format!("unexpected trailing character '{}'", byte as char)));
	}
	Ok(value)
}

struct Parser<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> Parser<'a> {
	fn new(bytes: &'a [u8]) -> Parser<'a> {
		Parser { bytes, pos: 0 }
	}

	fn peek(&self) -> Option<u8> {
		self.bytes.get(self.pos).copied()
	}

	fn next(&mut self) -> Result<u8> {
		let byte = self.peek().ok_or_else(|| anyhow!("{}", self.error_at("unexpected end of input")))?;
		self.pos += 1;
		Ok(byte)
	}

	fn skip_whitespace(&mut self) {
		while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
			self.pos += 1;
		}
	}

	fn error_at(&self, msg: &str) -> String {
		format!("{msg} at position {}", self.pos)
	}

	fn expect(&mut self, expected: u8) -> Result<()> {
		let byte = self.next()?;
		if byte != expected {
			bail!(
				"{}",
				self.error_at(&format!("expected '{}', found '{}'", expected as char, byte as char))
			);
		}
		Ok(())
	}

	fn parse_value(&mut self) -> Result<JsonValue> {
		self.skip_whitespace();
		match self.peek() {
			Some(b'[') => self.parse_array(),
			Some(b'{') => self.parse_object(),
			Some(b'"') => Ok(JsonValue::String(self.parse_string()?)),
			Some(b't') => self.parse_tag("true", JsonValue::Boolean(true)),
			Some(b'f') => self.parse_tag("false", JsonValue::Boolean(false)),
			Some(b'n') => self.parse_tag("null", JsonValue::Null),
			Some(d) if d.is_ascii_digit() || d == b'-' => self.parse_number(),
			Some(c) => bail!("{}", self.error_at(&format!("unexpected character '{}'", c as char))),
			None => bail!("{}", self.error_at("unexpected end of input")),
		}
	}

	fn parse_tag(&mut self, tag: &str, value: JsonValue) -> Result<JsonValue> {
		for expected in tag.bytes() {
			if self.next()? != expected {
				bail!("{}", self.error_at(&format!("invalid literal, expected '{tag}'")));
			}
		}
		Ok(value)
	}

	fn parse_array(&mut self) -> Result<JsonValue> {
		self.expect(b'[')?;
		let mut items = Vec::new();
		self.skip_whitespace();
		if self.peek() == Some(b']') {
			self.pos += 1;
			return Ok(JsonValue::Array(JsonArray(items)));
		}
		loop {
			items.push(self.parse_value()?);
			self.skip_whitespace();
			match self.next()? {
				b',' => {}
				b']' => return Ok(JsonValue::Array(JsonArray(items))),
				c => bail!("{}", self.error_at(&format!("expected ',' or ']', found '{}'", c as char))),
			}
		}
	}

	fn parse_object(&mut self) -> Result<JsonValue> {
		self.expect(b'{')?;
		let mut entries = BTreeMap::new();
		self.skip_whitespace();
		if self.peek() == Some(b'}') {
			self.pos += 1;
			return Ok(JsonValue::Object(JsonObject(entries)));
		}
		loop {
			self.skip_whitespace();
			let key = self.parse_string()?;
			self.skip_whitespace();
			self.expect(b':')?;
			entries.insert(key, self.parse_value()?);
			self.skip_whitespace();
			match self.next()? {
				b',' => {}
				b'}' => return Ok(JsonValue::Object(JsonObject(entries))),
				c => bail!("{}", self.error_at(&format!("expected ',' or '}}', found '{}'", c as char))),
			}
		}
	}

	fn parse_string(&mut self) -> Result<String> {
		self.expect(b'"')?;
		let mut bytes = Vec::with_capacity(16);
		let mut hex = [0u8; 4];
		loop {
			match self.next()? {
				b'"' => break,
				b'\\' => match self.next()? {
					b'"' => bytes.push(b'"'),
					b'\\' => bytes.push(b'\\'),
					b'/' => bytes.push(b'/'),
					b'b' => bytes.push(b'\x08'),
					b'f' => bytes.push(b'\x0C'),
					b'n' => bytes.push(b'\n'),
					b'r' => bytes.push(b'\r'),
					b't' => bytes.push(b'\t'),
					b'u' => {
						for slot in &mut hex {
							*slot = self.next()?;
						}
						let code_point = u16::from_str_radix(
							std::str::from_utf8(&hex).map_err(|_| anyhow!("{}", self.error_at("invalid unicode escape")))?,
							16,
						)
						.map_err(|_| anyhow!("{}", self.error_at("invalid unicode escape")))?;
						bytes.extend_from_slice(
							String::from_utf16(&[code_point])
								.map_err(|_| anyhow!("{}", self.error_at("invalid unicode code point")))?
								.as_bytes(),
						);
					}
					c => bail!("{}", self.error_at(&format!("invalid escape '\\{}'", c as char))),
				},
				c => bytes.push(c),
			}
		}
		String::from_utf8(bytes).map_err(|_| anyhow!("{}", self.error_at("string is not valid UTF-8")))
	}

	fn parse_number(&mut self) -> Result<JsonValue> {
		let start = self.pos;
		if self.peek() == Some(b'-') {
			self.pos += 1;
		}
		while let Some(b'0'..=b'9') = self.peek() {
			self.pos += 1;
		}
		if self.peek() == Some(b'.') {
			self.pos += 1;
			while let Some(b'0'..=b'9') = self.peek() {
				self.pos += 1;
			}
		}
		if let Some(b'e' | b'E') = self.peek() {
			self.pos += 1;
			if let Some(b'+' | b'-') = self.peek() {
				self.pos += 1;
			}
			while let Some(b'0'..=b'9') = self.peek() {
				self.pos += 1;
			}
		}
		let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
		text
			.parse::<f64>()
			.map(JsonValue::Number)
			.map_err(|_| anyhow!("{}", self.error_at(&format!("invalid number '{text}'"))))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::json::JsonObject;

	#[test]
	fn parses_nested_documents() -> Result<()> {
		let data = r#"{"layers":[{"id":"bg","paint":{"fill-opacity":0.5}},{"id":"roads"}],"version":8}"#;
		let value = parse_json_str(data)?;
		let object = value.as_object()?;
		assert_eq!(object.get_number("version")?, Some(8.0));
		let layers = object.get_array("layers")?.unwrap();
		assert_eq!(layers.len(), 2);
		assert_eq!(layers.get(0).unwrap().as_object()?.get_string("id")?, Some("bg".into()));
		Ok(())
	}

	#[test]
	fn parses_scalars() -> Result<()> {
		assert_eq!(parse_json_str("true")?, JsonValue::Boolean(true));
		assert_eq!(parse_json_str("false")?, JsonValue::Boolean(false));
		assert_eq!(parse_json_str("null")?, JsonValue::Null);
		assert_eq!(parse_json_str("-12.5e2")?, JsonValue::Number(-1250.0));
		assert_eq!(parse_json_str(" \"x\" ")?, JsonValue::from("x"));
		Ok(())
	}

	#[test]
	fn parses_string_escapes() -> Result<()> {
		assert_eq!(parse_json_str(r#""a\nb\t\"c\" ä""#)?, JsonValue::from("a\nb\t\"c\" ä"));
		Ok(())
	}

	#[test]
	fn empty_containers() -> Result<()> {
		assert_eq!(parse_json_str("[]")?, JsonValue::Array(JsonArray(vec![])));
		assert_eq!(parse_json_str("{}")?, JsonValue::Object(JsonObject::new()));
		Ok(())
	}

	#[test]
	fn rejects_malformed_input() {
		for bad in ["{\"a\":}", "[1,", "tru", "\"unterminated", "{\"a\" 1}", "1 2", "{'a':1}"] {
			assert!(parse_json_str(bad).is_err(), "should reject {bad:?}");
		}
	}

	#[test]
	fn errors_carry_positions() {
		let error = parse_json_str("[1,]").unwrap_err();
		assert!(format!("{error:#}").contains("position"), "{error:#}");
	}
}
