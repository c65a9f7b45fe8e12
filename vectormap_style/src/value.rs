//! The scalar variant style properties evaluate to.

use crate::color::Color;
use vectormap_core::json::JsonValue;
use vectormap_geometry::TagValue;

/// Result of resolving a style property or expression. Sized in place;
/// only strings and arrays allocate.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleValue {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	Color(Color),
	Array(Vec<StyleValue>),
}

impl StyleValue {
	#[must_use]
	pub fn is_null(&self) -> bool {
		matches!(self, StyleValue::Null)
	}

	#[must_use]
	pub fn as_number(&self) -> Option<f64> {
		match self {
			StyleValue::Number(value) => Some(*value),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			StyleValue::String(text) => Some(text),
			_ => None,
		}
	}

	/// Color view: colors pass through, strings are parsed on demand.
	#[must_use]
	pub fn as_color(&self) -> Option<Color> {
		match self {
			StyleValue::Color(color) => Some(*color),
			StyleValue::String(text) => Color::parse(text).ok(),
			_ => None,
		}
	}

	#[must_use]
	pub fn is_true(&self) -> bool {
		matches!(self, StyleValue::Bool(true))
	}

	/// Literal conversion of a JSON node (no operator handling).
	#[must_use]
	pub fn from_literal(json: &JsonValue) -> StyleValue {
		match json {
			JsonValue::Null => StyleValue::Null,
			JsonValue::Boolean(value) => StyleValue::Bool(*value),
			JsonValue::Number(value) => StyleValue::Number(*value),
			JsonValue::String(text) => StyleValue::String(text.clone()),
			JsonValue::Array(array) => StyleValue::Array(array.iter().map(StyleValue::from_literal).collect()),
			JsonValue::Object(_) => StyleValue::Null,
		}
	}
}

impl From<&TagValue> for StyleValue {
	fn from(value: &TagValue) -> Self {
		match value {
			TagValue::Bool(v) => StyleValue::Bool(*v),
			TagValue::String(v) => StyleValue::String(v.clone()),
			TagValue::Double(_) | TagValue::Float(_) | TagValue::Int(_) | TagValue::UInt(_) => {
				StyleValue::Number(value.as_number().unwrap())
			}
		}
	}
}

impl From<Color> for StyleValue {
	fn from(value: Color) -> Self {
		StyleValue::Color(value)
	}
}

impl From<f64> for StyleValue {
	fn from(value: f64) -> Self {
		StyleValue::Number(value)
	}
}

impl From<&str> for StyleValue {
	fn from(value: &str) -> Self {
		StyleValue::String(value.to_string())
	}
}

impl From<bool> for StyleValue {
	fn from(value: bool) -> Self {
		StyleValue::Bool(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tag_value_conversion() {
		assert_eq!(StyleValue::from(&TagValue::Int(-4)), StyleValue::Number(-4.0));
		assert_eq!(StyleValue::from(&TagValue::from("x")), StyleValue::from("x"));
		assert_eq!(StyleValue::from(&TagValue::Bool(true)), StyleValue::Bool(true));
	}

	#[test]
	fn color_view_parses_strings() {
		assert_eq!(
			StyleValue::from("#f00").as_color(),
			Some(Color::rgb(1.0, 0.0, 0.0))
		);
		assert_eq!(StyleValue::from("gibberish").as_color(), None);
		assert_eq!(StyleValue::Number(1.0).as_color(), None);
	}

	#[test]
	fn literal_conversion_keeps_structure() {
		let json = JsonValue::parse_str(r#"["motorway", 2, null]"#).unwrap();
		assert_eq!(
			StyleValue::from_literal(&json),
			StyleValue::Array(vec![
				StyleValue::from("motorway"),
				StyleValue::Number(2.0),
				StyleValue::Null
			])
		);
	}
}
