//! JSON object type with typed accessors used by the stylesheet parser.

use crate::json::{JsonArray, JsonValue};
use anyhow::Result;
use std::{collections::BTreeMap, fmt::Debug};

/// A JSON object backed by a `BTreeMap<String, JsonValue>`.
#[derive(Clone, Default, PartialEq)]
pub struct JsonObject(pub BTreeMap<String, JsonValue>);

impl JsonObject {
	#[must_use]
	pub fn new() -> Self {
		Self(BTreeMap::new())
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&JsonValue> {
		self.0.get(key)
	}

	#[must_use]
	pub fn contains_key(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	/// Retrieve a string for `key`; `None` if missing, an error if present
	/// but not a string. The other typed getters behave the same way.
	pub fn get_string(&self, key: &str) -> Result<Option<String>> {
		self.get(key).map(JsonValue::as_string).transpose()
	}

	pub fn get_number(&self, key: &str) -> Result<Option<f64>> {
		self.get(key).map(JsonValue::as_number).transpose()
	}

	pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
		self.get(key).map(JsonValue::as_bool).transpose()
	}

	pub fn get_array(&self, key: &str) -> Result<Option<&JsonArray>> {
		self.get(key).map(JsonValue::as_array).transpose()
	}

	pub fn get_object(&self, key: &str) -> Result<Option<&JsonObject>> {
		self.get(key).map(JsonValue::as_object).transpose()
	}

	pub fn set<T>(&mut self, key: &str, value: T)
	where
		JsonValue: From<T>,
	{
		self.0.insert(key.to_string(), JsonValue::from(value));
	}

	#[must_use]
	pub fn stringify(&self) -> String {
		let items = self
			.0
			.iter()
			.map(|(key, value)| format!("\"{key}\":{}", value.stringify()))
			.collect::<Vec<_>>();
		format!("{{{}}}", items.join(","))
	}
}

impl Debug for JsonObject {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_map().entries(&self.0).finish()
	}
}

impl From<Vec<(&str, JsonValue)>> for JsonObject {
	fn from(input: Vec<(&str, JsonValue)>) -> Self {
		JsonObject(input.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn object() -> JsonObject {
		JsonObject::from(vec![
			("name", JsonValue::from("water")),
			("minzoom", JsonValue::from(4.0)),
			("visible", JsonValue::from(true)),
		])
	}

	#[test]
	fn typed_getters() -> Result<()> {
		let object = object();
		assert_eq!(object.get_string("name")?, Some(String::from("water")));
		assert_eq!(object.get_number("minzoom")?, Some(4.0));
		assert_eq!(object.get_bool("visible")?, Some(true));
		assert_eq!(object.get_string("missing")?, None);
		assert!(object.get_number("name").is_err());
		Ok(())
	}

	#[test]
	fn set_and_stringify() {
		let mut object = JsonObject::new();
		object.set("b", 2.0);
		object.set("a", "x");
		assert_eq!(object.stringify(), r#"{"a":"x","b":2}"#);
	}
}
