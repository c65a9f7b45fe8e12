//! Wire-format features and their decoded counterpart.
//!
//! A wire feature carries its geometry as zig-zag encoded draw commands
//! (`MoveTo`, `LineTo`, `ClosePath`) and its metadata as indices into the
//! layer's key/value dictionaries. Decoding resolves both eagerly: the
//! renderer receives typed shapes and a ready metadata map, never raw
//! command streams.

use super::geometry::{FeatureGeometry, TilePath, ring_area};
use crate::FeatureMeta;
use anyhow::{Context, Result, bail, ensure};
use log::trace;
use vectormap_core::{
	Blob,
	io::{ValueReader, ValueWriter},
};

const CMD_MOVE_TO: u64 = 1;
const CMD_LINE_TO: u64 = 2;
const CMD_CLOSE_PATH: u64 = 7;

/// A fully decoded feature: typed shape plus resolved metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct TileFeature {
	pub id: Option<u64>,
	pub geometry: FeatureGeometry,
	pub meta: FeatureMeta,
}

/// Wire-level feature as it sits inside a layer message, before the
/// layer's dictionaries are applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WireFeature {
	pub id: Option<u64>,
	pub tag_ids: Vec<u32>,
	pub geom_type: u64,
	pub geom_data: Blob,
}

impl WireFeature {
	pub fn read(reader: &mut ValueReader) -> Result<WireFeature> {
		let mut feature = WireFeature::default();

		while reader.has_remaining() {
			match reader.read_pbf_key()? {
				(1, 0) => feature.id = Some(reader.read_varint().context("failed to read feature id")?),
				(2, 2) => feature.tag_ids = reader.read_pbf_packed_u32().context("failed to read tag ids")?,
				(3, 0) => feature.geom_type = reader.read_varint().context("failed to read geometry type")?,
				(4, 2) => feature.geom_data = reader.read_pbf_blob().context("failed to read geometry data")?,
				(f, w) => bail!("unexpected field ({f}) / wire type ({w}) in feature"),
			}
		}

		Ok(feature)
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriter::new();

		if let Some(id) = self.id {
			writer.write_pbf_key(1, 0)?;
			writer.write_varint(id)?;
		}

		if !self.tag_ids.is_empty() {
			writer.write_pbf_key(2, 2)?;
			writer.write_pbf_packed_u32(&self.tag_ids)?;
		}

		writer.write_pbf_key(3, 0)?;
		writer.write_varint(self.geom_type)?;

		if !self.geom_data.is_empty() {
			writer.write_pbf_key(4, 2)?;
			writer.write_pbf_blob(&self.geom_data)?;
		}

		Ok(writer.into_blob())
	}

	/// Resolves the command stream into a typed shape.
	///
	/// Returns `None` for the unknown geometry type (such features are
	/// discarded); any malformed command stream is an error that fails the
	/// whole tile.
	pub fn decode_geometry(&self) -> Result<Option<FeatureGeometry>> {
		if !(1..=3).contains(&self.geom_type) {
			return Ok(None);
		}

		let paths = decode_paths(&self.geom_data)?;

		let geometry = match self.geom_type {
			1 => {
				ensure!(!paths.is_empty(), "point features must carry at least one point");
				let mut points = Vec::with_capacity(paths.len());
				for mut path in paths {
					ensure!(path.len() == 1, "point entries must carry exactly one coordinate");
					points.push(path.pop().unwrap());
				}
				FeatureGeometry::Point(points)
			}
			2 => {
				ensure!(!paths.is_empty(), "line features must carry at least one path");
				for path in &paths {
					ensure!(path.len() >= 2, "each line must carry at least two points");
				}
				FeatureGeometry::Line(paths)
			}
			3 => FeatureGeometry::Polygon(assemble_rings(paths)?),
			_ => unreachable!(),
		};

		Ok(Some(geometry))
	}
}

/// Runs the command stream: `MoveTo` opens a new path, `LineTo` extends
/// it, `ClosePath` repeats the first point. Coordinates are cumulative
/// zig-zag deltas across the whole stream.
fn decode_paths(geom_data: &Blob) -> Result<Vec<TilePath>> {
	let mut reader = ValueReader::new(geom_data.as_slice());
	let mut paths: Vec<TilePath> = Vec::new();
	let mut path: TilePath = Vec::new();
	let mut x = 0i64;
	let mut y = 0i64;

	while reader.has_remaining() {
		let value = reader.read_varint().context("failed to read geometry command")?;
		let command = value & 0x7;
		let count = value >> 3;

		match command {
			CMD_MOVE_TO | CMD_LINE_TO => {
				for _ in 0..count {
					if command == CMD_MOVE_TO && !path.is_empty() {
						paths.push(path);
						path = Vec::new();
					}
					x += reader.read_svarint().context("failed to read x coordinate")?;
					y += reader.read_svarint().context("failed to read y coordinate")?;
					path.push([x as f64, y as f64]);
				}
			}
			CMD_CLOSE_PATH => {
				ensure!(!path.is_empty(), "ClosePath command on an empty path");
				path.push(path[0]);
			}
			_ => bail!("unknown geometry command {command}"),
		}
	}

	if !path.is_empty() {
		paths.push(path);
	}

	Ok(paths)
}

/// Validates ring shape and winding order. Zero-area rings and holes that
/// arrive before any exterior ring are dropped, matching the non-zero
/// winding interpretation.
fn assemble_rings(paths: Vec<TilePath>) -> Result<Vec<TilePath>> {
	ensure!(!paths.is_empty(), "polygon features must carry at least one ring");

	let mut rings = Vec::with_capacity(paths.len());
	let mut seen_exterior = false;

	for ring in paths {
		ensure!(ring.len() >= 4, "each ring must carry at least four points (A,B,C,A)");
		ensure!(ring.first() == ring.last(), "rings must be closed");

		let area = ring_area(&ring);
		if area > 1e-14 {
			seen_exterior = true;
			rings.push(ring);
		} else if area < -1e-14 {
			if seen_exterior {
				rings.push(ring);
			} else {
				trace!("dropping interior ring that precedes any exterior ring");
			}
		} else {
			trace!("dropping ring with zero area");
		}
	}

	ensure!(!rings.is_empty(), "polygon features must carry at least one usable ring");
	Ok(rings)
}

/// Encodes a typed shape back into a command stream, returning the wire
/// geometry type alongside the bytes.
pub(crate) fn encode_geometry(geometry: &FeatureGeometry) -> Result<(u64, Blob)> {
	geometry.check()?;
	let mut writer = ValueWriter::new();
	let cursor = &mut (0i64, 0i64);

	let geom_type = match geometry {
		FeatureGeometry::Point(points) => {
			writer.write_varint(((points.len() as u64) << 3) | CMD_MOVE_TO)?;
			for point in points {
				write_point(&mut writer, cursor, point)?;
			}
			1
		}
		FeatureGeometry::Line(lines) => {
			for line in lines {
				writer.write_varint((1 << 3) | CMD_MOVE_TO)?;
				write_point(&mut writer, cursor, &line[0])?;
				writer.write_varint(((line.len() as u64 - 1) << 3) | CMD_LINE_TO)?;
				for point in &line[1..] {
					write_point(&mut writer, cursor, point)?;
				}
			}
			2
		}
		FeatureGeometry::Polygon(rings) => {
			for ring in rings {
				// the closing duplicate is implied by ClosePath
				let open = &ring[..ring.len() - 1];
				writer.write_varint((1 << 3) | CMD_MOVE_TO)?;
				write_point(&mut writer, cursor, &open[0])?;
				writer.write_varint(((open.len() as u64 - 1) << 3) | CMD_LINE_TO)?;
				for point in &open[1..] {
					write_point(&mut writer, cursor, point)?;
				}
				writer.write_varint(CMD_CLOSE_PATH)?;
			}
			3
		}
	};

	Ok((geom_type, writer.into_blob()))
}

fn write_point(writer: &mut ValueWriter, cursor: &mut (i64, i64), point: &[f64; 2]) -> Result<()> {
	let x = point[0].round() as i64;
	let y = point[1].round() as i64;
	writer.write_svarint(x - cursor.0)?;
	writer.write_svarint(y - cursor.1)?;
	cursor.0 = x;
	cursor.1 = y;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn round_trip(geometry: FeatureGeometry) -> Result<()> {
		let (geom_type, geom_data) = encode_geometry(&geometry)?;
		let wire = WireFeature {
			id: None,
			tag_ids: vec![],
			geom_type,
			geom_data,
		};
		assert_eq!(wire.decode_geometry()?, Some(geometry));
		Ok(())
	}

	#[test]
	fn point_round_trip() -> Result<()> {
		round_trip(FeatureGeometry::Point(vec![[25.0, 17.0]]))?;
		round_trip(FeatureGeometry::Point(vec![[5.0, 7.0], [3.0, 2.0]]))
	}

	#[test]
	fn line_round_trip() -> Result<()> {
		round_trip(FeatureGeometry::Line(vec![
			vec![[2.0, 2.0], [2.0, 10.0], [10.0, 10.0]],
			vec![[1.0, 1.0], [3.0, 5.0]],
		]))
	}

	#[test]
	fn polygon_with_hole_round_trip() -> Result<()> {
		round_trip(FeatureGeometry::Polygon(vec![
			vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
			vec![[2.0, 2.0], [2.0, 6.0], [6.0, 6.0], [2.0, 2.0]],
		]))
	}

	#[test]
	fn known_command_stream() -> Result<()> {
		// MoveTo(1) (25,17): 0x09 0x32 0x22, the example bytes from the MVT documentation
		let wire = WireFeature {
			id: None,
			tag_ids: vec![],
			geom_type: 1,
			geom_data: Blob::from(&[0x09, 0x32, 0x22]),
		};
		assert_eq!(wire.decode_geometry()?, Some(FeatureGeometry::Point(vec![[25.0, 17.0]])));
		Ok(())
	}

	#[test]
	fn unknown_geometry_is_discarded() -> Result<()> {
		let wire = WireFeature {
			id: Some(1),
			tag_ids: vec![],
			geom_type: 0,
			geom_data: Blob::from(&[0x09, 0x32, 0x22]),
		};
		assert_eq!(wire.decode_geometry()?, None);
		Ok(())
	}

	#[test]
	fn malformed_streams_fail() {
		// unknown command 3
		let wire = WireFeature {
			geom_type: 2,
			geom_data: Blob::from(&[0x0B]),
			..WireFeature::default()
		};
		assert!(wire.decode_geometry().is_err());

		// truncated coordinate
		let wire = WireFeature {
			geom_type: 1,
			geom_data: Blob::from(&[0x09, 0x32]),
			..WireFeature::default()
		};
		assert!(wire.decode_geometry().is_err());

		// ClosePath without a path
		let wire = WireFeature {
			geom_type: 3,
			geom_data: Blob::from(&[0x07]),
			..WireFeature::default()
		};
		assert!(wire.decode_geometry().is_err());
	}

	#[test]
	fn single_point_line_fails() {
		let (_, geom_data) = encode_geometry(&FeatureGeometry::Point(vec![[1.0, 1.0]])).unwrap();
		let wire = WireFeature {
			geom_type: 2,
			geom_data,
			..WireFeature::default()
		};
		assert!(wire.decode_geometry().is_err());
	}

	#[test]
	fn wire_feature_fields_round_trip() -> Result<()> {
		let wire = WireFeature {
			id: Some(42),
			tag_ids: vec![0, 1, 2, 0],
			geom_type: 1,
			geom_data: Blob::from(&[0x09, 0x32, 0x22]),
		};
		let blob = wire.to_blob()?;
		let mut reader = ValueReader::new(blob.as_slice());
		assert_eq!(WireFeature::read(&mut reader)?, wire);
		Ok(())
	}
}
