//! Writing typed values into a growing byte buffer.
//!
//! [`ValueWriter`] is the encoding mirror of
//! [`ValueReader`](super::ValueReader): varints, zig-zag signed varints,
//! little-endian floats and Protocol-Buffer framing. It exists mainly so
//! tests and fixtures can fabricate valid tile bytes, and so a decoded tile
//! can be written back wire-identical for the subset of features we model.

use crate::Blob;
use anyhow::Result;
use byteorder::{LittleEndian, WriteBytesExt};

#[derive(Default)]
pub struct ValueWriter {
	data: Vec<u8>,
}

impl ValueWriter {
	#[must_use]
	pub fn new() -> ValueWriter {
		ValueWriter::default()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.data.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	#[must_use]
	pub fn into_blob(self) -> Blob {
		Blob::from(self.data)
	}

	pub fn write_u8(&mut self, value: u8) -> Result<()> {
		self.data.write_u8(value)?;
		Ok(())
	}

	pub fn write_varint(&mut self, mut value: u64) -> Result<()> {
		loop {
			let mut byte = (value & 0x7F) as u8;
			value >>= 7;
			if value != 0 {
				byte |= 0x80;
			}
			self.data.write_u8(byte)?;
			if value == 0 {
				return Ok(());
			}
		}
	}

	pub fn write_svarint(&mut self, value: i64) -> Result<()> {
		self.write_varint(((value << 1) ^ (value >> 63)) as u64)
	}

	pub fn write_f32(&mut self, value: f32) -> Result<()> {
		self.data.write_f32::<LittleEndian>(value)?;
		Ok(())
	}

	pub fn write_f64(&mut self, value: f64) -> Result<()> {
		self.data.write_f64::<LittleEndian>(value)?;
		Ok(())
	}

	pub fn write_pbf_key(&mut self, field: u32, wire_type: u8) -> Result<()> {
		self.write_varint((u64::from(field) << 3) | u64::from(wire_type))
	}

	pub fn write_pbf_string(&mut self, text: &str) -> Result<()> {
		self.write_varint(text.len() as u64)?;
		self.data.extend_from_slice(text.as_bytes());
		Ok(())
	}

	pub fn write_pbf_blob(&mut self, blob: &Blob) -> Result<()> {
		self.write_varint(blob.len() as u64)?;
		self.data.extend_from_slice(blob.as_slice());
		Ok(())
	}

	pub fn write_pbf_packed_u32(&mut self, values: &[u32]) -> Result<()> {
		let mut packed = ValueWriter::new();
		for value in values {
			packed.write_varint(u64::from(*value))?;
		}
		self.write_pbf_blob(&packed.into_blob())
	}
}
