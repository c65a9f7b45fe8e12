//! Per-feature metadata: an ordered string → scalar mapping.

use crate::TagValue;
use std::{
	collections::{BTreeMap, btree_map},
	fmt::Debug,
};

#[derive(Clone, Default, PartialEq)]
pub struct FeatureMeta {
	entries: BTreeMap<String, TagValue>,
}

impl FeatureMeta {
	#[must_use]
	pub fn new() -> FeatureMeta {
		FeatureMeta::default()
	}

	pub fn insert(&mut self, key: String, value: TagValue) {
		self.entries.insert(key, value);
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&TagValue> {
		self.entries.get(key)
	}

	#[must_use]
	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> btree_map::Iter<'_, String, TagValue> {
		self.entries.iter()
	}
}

impl Debug for FeatureMeta {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_map().entries(&self.entries).finish()
	}
}

impl From<Vec<(&str, TagValue)>> for FeatureMeta {
	fn from(value: Vec<(&str, TagValue)>) -> Self {
		FeatureMeta {
			entries: value.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
		}
	}
}

impl FromIterator<(String, TagValue)> for FeatureMeta {
	fn from_iter<T: IntoIterator<Item = (String, TagValue)>>(iter: T) -> Self {
		FeatureMeta {
			entries: BTreeMap::from_iter(iter),
		}
	}
}
