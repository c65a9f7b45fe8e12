//! Reading typed values out of an in-memory byte slice.
//!
//! # Overview
//!
//! [`ValueReader`] walks a borrowed slice and decodes the primitives the
//! tile wire format is built from: varints, zig-zag signed varints,
//! little-endian floats, and Protocol-Buffer framing (field keys,
//! length-delimited blobs, packed integer arrays). Nested messages are read
//! through [`ValueReader::pbf_message`], which yields a sub-reader limited
//! to the embedded message without copying.
//!
//! # Examples
//!
//! ```
//! use vectormap_core::io::ValueReader;
//!
//! let data = [0x96, 0x01, 0x03];
//! let mut reader = ValueReader::new(&data);
//! assert_eq!(reader.read_varint().unwrap(), 150);
//! assert_eq!(reader.read_svarint().unwrap(), -2);
//! assert!(!reader.has_remaining());
//! ```

use crate::Blob;
use anyhow::{Context, Result, bail, ensure};
use byteorder::{ByteOrder, LittleEndian};

pub struct ValueReader<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> ValueReader<'a> {
	#[must_use]
	pub fn new(data: &'a [u8]) -> ValueReader<'a> {
		ValueReader { data, pos: 0 }
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
	pub fn position(&self) -> usize {
		self.pos
	}

	#[must_use]
	pub fn remaining(&self) -> usize {
		self.data.len() - self.pos
	}

	#[must_use]
	pub fn has_remaining(&self) -> bool {
		self.remaining() > 0
	}

	fn take(&mut self, length: usize) -> Result<&'a [u8]> {
		ensure!(
			length <= self.remaining(),
			"read of {length} bytes exceeds the {} remaining",
			self.remaining()
		);
		let slice = &self.data[self.pos..self.pos + length];
		self.pos += length;
		Ok(slice)
	}

	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.take(1)?[0])
	}

	/// Reads a variable-length unsigned integer.
	///
	/// # Errors
	/// Fails on truncated input or a varint longer than 10 bytes.
	pub fn read_varint(&mut self) -> Result<u64> {
		let mut value = 0u64;
		let mut shift = 0;
		loop {
			let byte = self.read_u8().context("truncated varint")?;
			value |= (u64::from(byte) & 0x7F) << shift;
			if byte & 0x80 == 0 {
				break;
			}
			shift += 7;
			if shift >= 70 {
				bail!("varint too long");
			}
		}
		Ok(value)
	}

	/// Reads a zig-zag encoded signed varint.
	pub fn read_svarint(&mut self) -> Result<i64> {
		let value = self.read_varint()? as i64;
		Ok((value >> 1) ^ -(value & 1))
	}

	pub fn read_f32(&mut self) -> Result<f32> {
		Ok(LittleEndian::read_f32(self.take(4)?))
	}

	pub fn read_f64(&mut self) -> Result<f64> {
		Ok(LittleEndian::read_f64(self.take(8)?))
	}

	pub fn read_blob(&mut self, length: usize) -> Result<Blob> {
		Ok(Blob::from(self.take(length)?))
	}

	pub fn read_string(&mut self, length: usize) -> Result<String> {
		Ok(String::from_utf8(self.take(length)?.to_vec())?)
	}

	/// Reads a Protocol-Buffer key and splits it into `(field, wire_type)`.
	pub fn read_pbf_key(&mut self) -> Result<(u32, u8)> {
		let value = self.read_varint().context("failed to read PBF key")?;
		Ok(((value >> 3) as u32, (value & 0x07) as u8))
	}

	/// Reads a length-delimited string field.
	pub fn read_pbf_string(&mut self) -> Result<String> {
		let length = self.read_varint()?;
		self.read_string(length as usize)
	}

	/// Reads a length-delimited bytes field.
	pub fn read_pbf_blob(&mut self) -> Result<Blob> {
		let length = self.read_varint()?;
		self.read_blob(length as usize)
	}

	/// Reads a packed array of unsigned 32-bit varints.
	pub fn read_pbf_packed_u32(&mut self) -> Result<Vec<u32>> {
		let length = self.read_varint()?;
		let mut sub = self.sub_reader(length as usize)?;
		let mut values = Vec::new();
		while sub.has_remaining() {
			values.push(sub.read_varint()? as u32);
		}
		Ok(values)
	}

	/// Reads a length prefix and returns a reader restricted to the
	/// embedded message.
	pub fn pbf_message(&mut self) -> Result<ValueReader<'a>> {
		let length = self.read_varint()?;
		self.sub_reader(length as usize)
	}

	fn sub_reader(&mut self, length: usize) -> Result<ValueReader<'a>> {
		Ok(ValueReader::new(self.take(length)?))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn varints() -> Result<()> {
		let data = [0x00, 0x01, 0xAC, 0x02, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
		let mut reader = ValueReader::new(&data);
		assert_eq!(reader.read_varint()?, 0);
		assert_eq!(reader.read_varint()?, 1);
		assert_eq!(reader.read_varint()?, 300);
		assert_eq!(reader.read_varint()?, 0xFFFF_FFFF);
		Ok(())
	}

	#[test]
	fn varint_truncated() {
		let mut reader = ValueReader::new(&[0x80]);
		assert!(reader.read_varint().is_err());
	}

	#[test]
	fn varint_too_long() {
		let mut reader = ValueReader::new(&[0x80; 11]);
		assert!(reader.read_varint().is_err());
	}

	#[test]
	fn svarints_zigzag() -> Result<()> {
		let data = [0x00, 0x01, 0x02, 0x03, 0x04];
		let mut reader = ValueReader::new(&data);
		assert_eq!(reader.read_svarint()?, 0);
		assert_eq!(reader.read_svarint()?, -1);
		assert_eq!(reader.read_svarint()?, 1);
		assert_eq!(reader.read_svarint()?, -2);
		assert_eq!(reader.read_svarint()?, 2);
		Ok(())
	}

	#[test]
	fn floats_are_little_endian() -> Result<()> {
		let data = [0x00, 0x00, 0x80, 0x3F];
		assert_eq!(ValueReader::new(&data).read_f32()?, 1.0);
		let data = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xF0, 0x3F];
		assert_eq!(ValueReader::new(&data).read_f64()?, 1.0);
		Ok(())
	}

	#[test]
	fn pbf_key_splits_field_and_wire_type() -> Result<()> {
		// field 3, wire type 2
		let mut reader = ValueReader::new(&[0x1A]);
		assert_eq!(reader.read_pbf_key()?, (3, 2));
		Ok(())
	}

	#[test]
	fn pbf_string_and_blob() -> Result<()> {
		let data = [0x05, b'h', b'e', b'l', b'l', b'o', 0x02, 0xAB, 0xCD];
		let mut reader = ValueReader::new(&data);
		assert_eq!(reader.read_pbf_string()?, "hello");
		assert_eq!(reader.read_pbf_blob()?.as_slice(), &[0xAB, 0xCD]);
		Ok(())
	}

	#[test]
	fn packed_u32() -> Result<()> {
		let data = [0x03, 0x01, 0xAC, 0x02];
		let mut reader = ValueReader::new(&data);
		assert_eq!(reader.read_pbf_packed_u32()?, vec![1, 300]);
		Ok(())
	}

	#[test]
	fn sub_reader_is_bounded() -> Result<()> {
		let data = [0x02, 0x07, 0x08, 0x09];
		let mut reader = ValueReader::new(&data);
		let mut sub = reader.pbf_message()?;
		assert_eq!(sub.read_u8()?, 7);
		assert_eq!(sub.read_u8()?, 8);
		assert!(sub.read_u8().is_err());
		assert_eq!(reader.read_u8()?, 9);
		Ok(())
	}

	#[test]
	fn take_rejects_overread() {
		let mut reader = ValueReader::new(&[1, 2]);
		assert!(reader.read_blob(3).is_err());
	}
}
