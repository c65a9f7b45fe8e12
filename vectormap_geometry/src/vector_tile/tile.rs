//! A whole decoded vector tile: named source layers.

use super::layer::TileLayer;
use anyhow::{Context, Result, bail, ensure};
use vectormap_core::{
	Blob,
	io::{ValueReader, ValueWriter},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorTile {
	/// Layers in wire order; names are unique within a tile.
	pub layers: Vec<TileLayer>,
}

impl VectorTile {
	#[must_use]
	pub fn new(layers: Vec<TileLayer>) -> VectorTile {
		VectorTile { layers }
	}

	/// Decodes a complete tile. Any malformed content fails the whole
	/// tile; partial tiles are never surfaced.
	pub fn from_blob(blob: &Blob) -> Result<VectorTile> {
		let mut reader = ValueReader::new(blob.as_slice());
		let mut tile = VectorTile::default();

		while reader.has_remaining() {
			match reader.read_pbf_key().context("failed to read tile field")? {
				(3, 2) => {
					let layer =
						TileLayer::read(&mut reader.pbf_message()?).context("failed to read tile layer")?;
					ensure!(
						tile.layer(&layer.name).is_none(),
						"duplicate source layer '{}'",
						layer.name
					);
					tile.layers.push(layer);
				}
				(f, w) => bail!("unexpected field ({f}) / wire type ({w}) in tile"),
			}
		}

		Ok(tile)
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = ValueWriter::new();
		for layer in &self.layers {
			writer.write_pbf_key(3, 2)?;
			writer.write_pbf_blob(&layer.to_blob()?)?;
		}
		Ok(writer.into_blob())
	}

	/// Looks up a source layer by name.
	#[must_use]
	pub fn layer(&self, name: &str) -> Option<&TileLayer> {
		self.layers.iter().find(|layer| layer.name == name)
	}
}
