//! JSON value enum representing any valid JSON data.

use crate::json::{JsonArray, JsonObject, parse_json_str};
use anyhow::{Result, bail};

/// Represents any JSON data: arrays, objects, numbers, strings, booleans,
/// and null. Stylesheet documents and style expressions are both carried
/// around as `JsonValue` trees.
#[derive(Clone, Debug, PartialEq)]
pub enum JsonValue {
	Array(JsonArray),
	Boolean(bool),
	Null,
	Number(f64),
	Object(JsonObject),
	String(String),
}

impl JsonValue {
	/// Parse a JSON string into a `JsonValue`.
	///
	/// # Errors
	/// Returns an error if the JSON is invalid.
	pub fn parse_str(json: &str) -> Result<JsonValue> {
		parse_json_str(json)
	}

	/// Return the JSON type as a lowercase string (`"array"`, `"object"`, etc.).
	#[must_use]
	pub fn type_as_str(&self) -> &str {
		use JsonValue::*;
		match self {
			Array(_) => "array",
			Boolean(_) => "boolean",
			Null => "null",
			Number(_) => "number",
			Object(_) => "object",
			String(_) => "string",
		}
	}

	/// Serialize to a compact JSON string without unnecessary whitespace.
	#[must_use]
	pub fn stringify(&self) -> String {
		match self {
			JsonValue::Array(array) => array.stringify(),
			JsonValue::Boolean(value) => value.to_string(),
			JsonValue::Null => String::from("null"),
			JsonValue::Number(value) => value.to_string(),
			JsonValue::Object(object) => object.stringify(),
			JsonValue::String(text) => format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\"")),
		}
	}

	pub fn as_array(&self) -> Result<&JsonArray> {
		if let JsonValue::Array(array) = self {
			Ok(array)
		} else {
			bail!("expected a JSON array, found a {}", self.type_as_str())
		}
	}

	pub fn as_object(&self) -> Result<&JsonObject> {
		if let JsonValue::Object(object) = self {
			Ok(object)
		} else {
			bail!("expected a JSON object, found a {}", self.type_as_str())
		}
	}

	pub fn as_string(&self) -> Result<String> {
		match self {
			JsonValue::String(text) => Ok(text.to_owned()),
			_ => bail!("expected a string, found a {}", self.type_as_str()),
		}
	}

	pub fn as_str(&self) -> Result<&str> {
		match self {
			JsonValue::String(text) => Ok(text),
			_ => bail!("expected a string, found a {}", self.type_as_str()),
		}
	}

	pub fn as_number(&self) -> Result<f64> {
		if let JsonValue::Number(value) = self {
			Ok(*value)
		} else {
			bail!("expected a number, found a {}", self.type_as_str())
		}
	}

	pub fn as_bool(&self) -> Result<bool> {
		if let JsonValue::Boolean(value) = self {
			Ok(*value)
		} else {
			bail!("expected a boolean, found a {}", self.type_as_str())
		}
	}

	#[must_use]
	pub fn is_null(&self) -> bool {
		matches!(self, JsonValue::Null)
	}
}

impl From<&str> for JsonValue {
	fn from(input: &str) -> Self {
		JsonValue::String(input.to_string())
	}
}

impl From<String> for JsonValue {
	fn from(input: String) -> Self {
		JsonValue::String(input)
	}
}

impl From<bool> for JsonValue {
	fn from(input: bool) -> Self {
		JsonValue::Boolean(input)
	}
}

impl From<f64> for JsonValue {
	fn from(input: f64) -> Self {
		JsonValue::Number(input)
	}
}

impl From<i32> for JsonValue {
	fn from(input: i32) -> Self {
		JsonValue::Number(f64::from(input))
	}
}

impl From<JsonArray> for JsonValue {
	fn from(input: JsonArray) -> Self {
		JsonValue::Array(input)
	}
}

impl From<JsonObject> for JsonValue {
	fn from(input: JsonObject) -> Self {
		JsonValue::Object(input)
	}
}

impl From<Vec<JsonValue>> for JsonValue {
	fn from(input: Vec<JsonValue>) -> Self {
		JsonValue::Array(JsonArray(input))
	}
}
