//! One named source layer inside a vector tile.

use super::feature::{TileFeature, WireFeature, encode_geometry};
use crate::{FeatureMeta, TagValue};
use anyhow::{Context, Result, anyhow, bail, ensure};
use vectormap_core::{
	Blob,
	io::{ValueReader, ValueWriter},
};

pub const DEFAULT_EXTENT: u32 = 4096;

/// A decoded source layer: ordered features with resolved metadata.
///
/// The wire format's key/value dictionaries only exist during decode and
/// encode; in memory every feature carries its own metadata map.
#[derive(Clone, Debug, PartialEq)]
pub struct TileLayer {
	pub name: String,
	pub extent: u32,
	pub version: u32,
	pub features: Vec<TileFeature>,
}

impl TileLayer {
	#[must_use]
	pub fn new(name: &str) -> TileLayer {
		TileLayer {
			name: name.to_string(),
			extent: DEFAULT_EXTENT,
			version: 2,
			features: Vec::new(),
		}
	}

	pub fn read(reader: &mut ValueReader) -> Result<TileLayer> {
		let mut name = None;
		let mut extent = DEFAULT_EXTENT;
		let mut version = 1;
		let mut keys: Vec<String> = Vec::new();
		let mut values: Vec<TagValue> = Vec::new();
		let mut wire_features: Vec<WireFeature> = Vec::new();

		while reader.has_remaining() {
			match reader.read_pbf_key()? {
				(1, 2) => name = Some(reader.read_pbf_string().context("failed to read layer name")?),
				(2, 2) => wire_features
					.push(WireFeature::read(&mut reader.pbf_message()?).context("failed to read feature")?),
				(3, 2) => keys.push(reader.read_pbf_string().context("failed to read dictionary key")?),
				(4, 2) => values
					.push(TagValue::read(&mut reader.pbf_message()?).context("failed to read dictionary value")?),
				(5, 0) => extent = reader.read_varint().context("failed to read extent")? as u32,
				(15, 0) => version = reader.read_varint().context("failed to read version")? as u32,
				(f, w) => bail!("unexpected field ({f}) / wire type ({w}) in layer"),
			}
		}

		ensure!(extent > 0, "layer extent must be positive");

		let mut features = Vec::with_capacity(wire_features.len());
		for wire in wire_features {
			// features with an unknown geometry type are discarded
			let Some(geometry) = wire.decode_geometry().context("failed to decode feature geometry")? else {
				continue;
			};
			features.push(TileFeature {
				id: wire.id,
				geometry,
				meta: resolve_tags(&wire.tag_ids, &keys, &values)?,
			});
		}

		Ok(TileLayer {
			name: name.ok_or_else(|| anyhow!("layer name is required"))?,
			extent,
			version,
			features,
		})
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut keys: Vec<String> = Vec::new();
		let mut values: Vec<TagValue> = Vec::new();
		let mut encoded_features = Vec::with_capacity(self.features.len());

		for feature in &self.features {
			let mut tag_ids = Vec::with_capacity(feature.meta.len() * 2);
			for (key, value) in feature.meta.iter() {
				tag_ids.push(intern_key(&mut keys, key));
				tag_ids.push(intern_value(&mut values, value));
			}
			let (geom_type, geom_data) = encode_geometry(&feature.geometry)?;
			encoded_features.push(WireFeature {
				id: feature.id,
				tag_ids,
				geom_type,
				geom_data,
			});
		}

		let mut writer = ValueWriter::new();
		writer.write_pbf_key(1, 2)?;
		writer.write_pbf_string(&self.name)?;

		for feature in &encoded_features {
			writer.write_pbf_key(2, 2)?;
			writer.write_pbf_blob(&feature.to_blob()?)?;
		}

		for key in &keys {
			writer.write_pbf_key(3, 2)?;
			writer.write_pbf_string(key)?;
		}

		for value in &values {
			writer.write_pbf_key(4, 2)?;
			writer.write_pbf_blob(&value.to_blob()?)?;
		}

		if self.extent != DEFAULT_EXTENT {
			writer.write_pbf_key(5, 0)?;
			writer.write_varint(u64::from(self.extent))?;
		}

		if self.version != 1 {
			writer.write_pbf_key(15, 0)?;
			writer.write_varint(u64::from(self.version))?;
		}

		Ok(writer.into_blob())
	}
}

/// Resolves paired dictionary indices into a metadata map.
fn resolve_tags(tag_ids: &[u32], keys: &[String], values: &[TagValue]) -> Result<FeatureMeta> {
	ensure!(tag_ids.len() % 2 == 0, "feature tag ids must come in pairs");

	let mut meta = FeatureMeta::new();
	for pair in tag_ids.chunks(2) {
		let key = keys
			.get(pair[0] as usize)
			.ok_or_else(|| anyhow!("tag key index {} out of range", pair[0]))?;
		let value = values
			.get(pair[1] as usize)
			.ok_or_else(|| anyhow!("tag value index {} out of range", pair[1]))?;
		meta.insert(key.clone(), value.clone());
	}
	Ok(meta)
}

fn intern_key(keys: &mut Vec<String>, key: &str) -> u32 {
	if let Some(index) = keys.iter().position(|k| k == key) {
		return index as u32;
	}
	keys.push(key.to_string());
	(keys.len() - 1) as u32
}

fn intern_value(values: &mut Vec<TagValue>, value: &TagValue) -> u32 {
	if let Some(index) = values.iter().position(|v| v == value) {
		return index as u32;
	}
	values.push(value.clone());
	(values.len() - 1) as u32
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::FeatureGeometry;

	fn example_layer() -> TileLayer {
		let mut layer = TileLayer::new("roads");
		layer.features.push(TileFeature {
			id: Some(1),
			geometry: FeatureGeometry::Line(vec![vec![[0.0, 0.0], [100.0, 50.0]]]),
			meta: FeatureMeta::from(vec![("class", TagValue::from("motorway")), ("lanes", TagValue::UInt(4))]),
		});
		layer.features.push(TileFeature {
			id: None,
			geometry: FeatureGeometry::Point(vec![[10.0, 10.0]]),
			meta: FeatureMeta::from(vec![("class", TagValue::from("exit"))]),
		});
		layer
	}

	#[test]
	fn encode_decode_round_trip() -> Result<()> {
		let layer = example_layer();
		let blob = layer.to_blob()?;
		let decoded = TileLayer::read(&mut ValueReader::new(blob.as_slice()))?;
		assert_eq!(decoded, layer);
		Ok(())
	}

	#[test]
	fn dictionaries_are_shared_between_features() -> Result<()> {
		let blob = example_layer().to_blob()?;
		// "class" must appear only once in the encoded bytes
		let haystack = blob.as_slice();
		let count = haystack.windows(5).filter(|window| *window == b"class").count();
		assert_eq!(count, 1);
		Ok(())
	}

	#[test]
	fn missing_name_fails() -> Result<()> {
		// a layer message with only an extent field
		let mut writer = ValueWriter::new();
		writer.write_pbf_key(5, 0)?;
		writer.write_varint(4096)?;
		let blob = writer.into_blob();
		assert!(TileLayer::read(&mut ValueReader::new(blob.as_slice())).is_err());
		Ok(())
	}

	#[test]
	fn out_of_range_tag_index_fails_the_layer() -> Result<()> {
		let wire = WireFeature {
			id: None,
			tag_ids: vec![0, 5],
			geom_type: 1,
			geom_data: Blob::from(&[0x09, 0x32, 0x22]),
		};
		let mut writer = ValueWriter::new();
		writer.write_pbf_key(1, 2)?;
		writer.write_pbf_string("broken")?;
		writer.write_pbf_key(2, 2)?;
		writer.write_pbf_blob(&wire.to_blob()?)?;
		writer.write_pbf_key(3, 2)?;
		writer.write_pbf_string("class")?;
		writer.write_pbf_key(4, 2)?;
		writer.write_pbf_blob(&TagValue::from("motorway").to_blob()?)?;
		let blob = writer.into_blob();

		assert!(TileLayer::read(&mut ValueReader::new(blob.as_slice())).is_err());
		Ok(())
	}

	#[test]
	fn odd_tag_count_fails() {
		assert!(resolve_tags(&[0], &[String::from("k")], &[TagValue::from("v")]).is_err());
	}

	#[test]
	fn unknown_geometry_features_are_dropped() -> Result<()> {
		// hand-build a layer with one unknown-type feature
		let wire = WireFeature {
			id: Some(9),
			tag_ids: vec![],
			geom_type: 0,
			geom_data: Blob::new_empty(),
		};
		let mut writer = ValueWriter::new();
		writer.write_pbf_key(1, 2)?;
		writer.write_pbf_string("empty")?;
		writer.write_pbf_key(2, 2)?;
		writer.write_pbf_blob(&wire.to_blob()?)?;
		let blob = writer.into_blob();

		let layer = TileLayer::read(&mut ValueReader::new(blob.as_slice()))?;
		assert_eq!(layer.name, "empty");
		assert!(layer.features.is_empty());
		Ok(())
	}

	#[test]
	fn extent_and_version_defaults() -> Result<()> {
		let mut writer = ValueWriter::new();
		writer.write_pbf_key(1, 2)?;
		writer.write_pbf_string("water")?;
		let blob = writer.into_blob();

		let layer = TileLayer::read(&mut ValueReader::new(blob.as_slice()))?;
		assert_eq!(layer.extent, DEFAULT_EXTENT);
		assert_eq!(layer.version, 1);
		Ok(())
	}
}
