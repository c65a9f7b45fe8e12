//! JSON array type and conversions to Rust vectors.

use crate::json::JsonValue;
use anyhow::Result;
use std::fmt::Debug;

/// A JSON array, backed by a `Vec<JsonValue>`.
#[derive(Clone, Default, PartialEq)]
pub struct JsonArray(pub Vec<JsonValue>);

impl JsonArray {
	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn get(&self, index: usize) -> Option<&JsonValue> {
		self.0.get(index)
	}

	pub fn iter(&self) -> std::slice::Iter<'_, JsonValue> {
		self.0.iter()
	}

	/// Serialize to a compact string without extra whitespace.
	#[must_use]
	pub fn stringify(&self) -> String {
		let items = self.0.iter().map(JsonValue::stringify).collect::<Vec<_>>();
		format!("[{}]", items.join(","))
	}

	/// Convert all elements to `String`s, failing if any element is not a string.
	pub fn as_string_vec(&self) -> Result<Vec<String>> {
		self.0.iter().map(JsonValue::as_string).collect()
	}

	/// Convert all elements to numbers, failing if any element is not numeric.
	pub fn as_number_vec(&self) -> Result<Vec<f64>> {
		self.0.iter().map(JsonValue::as_number).collect()
	}
}

impl Debug for JsonArray {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(&self.0).finish()
	}
}

impl From<Vec<JsonValue>> for JsonArray {
	fn from(input: Vec<JsonValue>) -> Self {
		JsonArray(input)
	}
}
