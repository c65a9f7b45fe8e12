//! Typed metadata values attached to tile features.
//!
//! [`TagValue`] is the scalar sum type a vector tile's key/value
//! dictionaries are built from. It covers the wire format's variant
//! message: string, float, double, signed/unsigned integer and boolean.

use anyhow::{Result, anyhow, bail};
use std::fmt::{Debug, Display};
use vectormap_core::{
	Blob,
	io::{ValueReader, ValueWriter},
};

#[derive(Clone, PartialEq)]
pub enum TagValue {
	Bool(bool),
	Double(f64),
	Float(f32),
	Int(i64),
	String(String),
	UInt(u64),
}

impl TagValue {
	/// Decodes one wire-format value message.
	///
	/// The message holds exactly one of the variant fields; if several are
	/// present the last one wins, and an empty message is an error.
	pub fn read(reader: &mut ValueReader) -> Result<TagValue> {
		let mut value: Option<TagValue> = None;

		while reader.has_remaining() {
			value = Some(match reader.read_pbf_key()? {
				(1, 2) => TagValue::String(reader.read_pbf_string()?),
				(2, 5) => TagValue::Float(reader.read_f32()?),
				(3, 1) => TagValue::Double(reader.read_f64()?),
				(4, 0) => TagValue::Int(reader.read_varint()? as i64),
				(5, 0) => TagValue::UInt(reader.read_varint()?),
				(6, 0) => TagValue::Int(reader.read_svarint()?),
				(7, 0) => TagValue::Bool(reader.read_varint()? != 0),
				(f, w) => bail!("unexpected field ({f}) / wire type ({w}) in tag value"),
			});
		}

		value.ok_or_else(|| anyhow!("empty tag value message"))
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriter::new();

		match self {
			TagValue::String(text) => {
				writer.write_pbf_key(1, 2)?;
				writer.write_pbf_string(text)?;
			}
			TagValue::Float(value) => {
				writer.write_pbf_key(2, 5)?;
				writer.write_f32(*value)?;
			}
			TagValue::Double(value) => {
				writer.write_pbf_key(3, 1)?;
				writer.write_f64(*value)?;
			}
			TagValue::UInt(value) => {
				writer.write_pbf_key(5, 0)?;
				writer.write_varint(*value)?;
			}
			TagValue::Int(value) => {
				writer.write_pbf_key(6, 0)?;
				writer.write_svarint(*value)?;
			}
			TagValue::Bool(value) => {
				writer.write_pbf_key(7, 0)?;
				writer.write_varint(u64::from(*value))?;
			}
		}

		Ok(writer.into_blob())
	}

	/// Numeric view used by the expression evaluator; `None` for strings
	/// and booleans.
	#[must_use]
	pub fn as_number(&self) -> Option<f64> {
		match self {
			TagValue::Double(value) => Some(*value),
			TagValue::Float(value) => Some(f64::from(*value)),
			TagValue::Int(value) => Some(*value as f64),
			TagValue::UInt(value) => Some(*value as f64),
			TagValue::Bool(_) | TagValue::String(_) => None,
		}
	}
}

impl Debug for TagValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
			Self::Double(v) => f.debug_tuple("Double").field(v).finish(),
			Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
			Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
			Self::String(v) => f.debug_tuple("String").field(v).finish(),
			Self::UInt(v) => f.debug_tuple("UInt").field(v).finish(),
		}
	}
}

impl Display for TagValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Bool(v) => Display::fmt(v, f),
			Self::Double(v) => Display::fmt(v, f),
			Self::Float(v) => Display::fmt(v, f),
			Self::Int(v) => Display::fmt(v, f),
			Self::String(v) => Display::fmt(v, f),
			Self::UInt(v) => Display::fmt(v, f),
		}
	}
}

impl From<&str> for TagValue {
	fn from(value: &str) -> Self {
		TagValue::String(value.to_string())
	}
}

impl From<String> for TagValue {
	fn from(value: String) -> Self {
		TagValue::String(value)
	}
}

impl From<bool> for TagValue {
	fn from(value: bool) -> Self {
		TagValue::Bool(value)
	}
}

impl From<i64> for TagValue {
	fn from(value: i64) -> Self {
		TagValue::Int(value)
	}
}

impl From<u64> for TagValue {
	fn from(value: u64) -> Self {
		TagValue::UInt(value)
	}
}

impl From<f64> for TagValue {
	fn from(value: f64) -> Self {
		TagValue::Double(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn round_trip(value: TagValue) -> Result<()> {
		let blob = value.to_blob()?;
		let mut reader = ValueReader::new(blob.as_slice());
		assert_eq!(TagValue::read(&mut reader)?, value);
		Ok(())
	}

	#[test]
	fn wire_round_trips() -> Result<()> {
		round_trip(TagValue::from("hello"))?;
		round_trip(TagValue::Float(1.5))?;
		round_trip(TagValue::Double(-0.25))?;
		round_trip(TagValue::Int(-75))?;
		round_trip(TagValue::UInt(348_085))?;
		round_trip(TagValue::Bool(true))?;
		Ok(())
	}

	#[test]
	fn string_wire_bytes() -> Result<()> {
		let blob = TagValue::from("hello").to_blob()?;
		assert_eq!(blob.as_slice(), &[0x0A, 0x05, b'h', b'e', b'l', b'l', b'o']);
		Ok(())
	}

	#[test]
	fn int_reads_both_encodings() -> Result<()> {
		// field 4: plain varint
		let mut reader = ValueReader::new(&[0x20, 0x96, 0x01]);
		assert_eq!(TagValue::read(&mut reader)?, TagValue::Int(150));
		// field 6: zig-zag
		let mut reader = ValueReader::new(&[0x30, 0x96, 0x01]);
		assert_eq!(TagValue::read(&mut reader)?, TagValue::Int(75));
		Ok(())
	}

	#[test]
	fn rejects_empty_and_unknown_fields() {
		assert!(TagValue::read(&mut ValueReader::new(&[])).is_err());
		assert!(TagValue::read(&mut ValueReader::new(&[0x45, 0, 0, 0, 0])).is_err());
	}

	#[test]
	fn numeric_view() {
		assert_eq!(TagValue::Int(-3).as_number(), Some(-3.0));
		assert_eq!(TagValue::UInt(3).as_number(), Some(3.0));
		assert_eq!(TagValue::Float(0.5).as_number(), Some(0.5));
		assert_eq!(TagValue::from("x").as_number(), None);
		assert_eq!(TagValue::Bool(true).as_number(), None);
	}
}
