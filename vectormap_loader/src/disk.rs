//! Disk tier of the tile cache.
//!
//! Layout: one file per tile under the configured base directory,
//! `z<z>x<x>y<y>.{mvt|png}`. Writes go to a `.tmp` sibling first and are
//! renamed over, so concurrent readers never observe a half-written tile.

use anyhow::{Context, Result};
use std::{
	fs,
	io::Write,
	path::{Path, PathBuf},
};
use vectormap_core::{Blob, TileCoord, TileType, disk_sub_path};

#[derive(Debug)]
pub struct DiskCache {
	base: PathBuf,
}

impl DiskCache {
	/// Opens (and bootstraps) the cache directory.
	pub fn new(base: &Path) -> Result<DiskCache> {
		fs::create_dir_all(base).with_context(|| format!("failed to create cache directory {base:?}"))?;
		Ok(DiskCache { base: base.to_path_buf() })
	}

	pub fn path_for(&self, coord: &TileCoord, tile_type: TileType) -> Result<PathBuf> {
		Ok(self.base.join(disk_sub_path(coord, tile_type)?))
	}

	/// Reads a tile's bytes; `Ok(None)` when the tile is not cached.
	pub fn read(&self, coord: &TileCoord, tile_type: TileType) -> Result<Option<Blob>> {
		let path = self.path_for(coord, tile_type)?;
		if !path.exists() {
			return Ok(None);
		}
		let bytes = fs::read(&path).with_context(|| format!("failed to read cached tile {path:?}"))?;
		Ok(Some(Blob::from(bytes)))
	}

	/// Writes a tile atomically: `.tmp` first, then rename over.
	pub fn write(&self, coord: &TileCoord, tile_type: TileType, bytes: &Blob) -> Result<()> {
		let path = self.path_for(coord, tile_type)?;
		let tmp = path.with_extension(format!("{}.tmp", tile_type.extension()));

		let mut file = fs::File::create(&tmp).with_context(|| format!("failed to create {tmp:?}"))?;
		file
			.write_all(bytes.as_slice())
			.and_then(|()| file.sync_all())
			.with_context(|| format!("failed to write {tmp:?}"))?;
		drop(file);

		fs::rename(&tmp, &path).with_context(|| format!("failed to move {tmp:?} into place"))
	}
}
