//! URL templating and disk-path mapping for tile sources.
//!
//! Source URLs are caller-provided templates carrying the literal tokens
//! `{z}`, `{x}` and `{y}`; anything else in the template (including query
//! strings and API keys) passes through untouched.

use crate::{TileCoord, TileType};
use anyhow::{Result, ensure};

/// Substitutes a tile coordinate into a URL template.
///
/// # Errors
/// Rejects coordinates outside the tile pyramid; that is a programmer
/// error at this surface, not a loadable-but-missing tile.
pub fn tile_url(template: &str, coord: &TileCoord) -> Result<String> {
	ensure!(coord.is_valid(), "invalid coordinate {coord:?} for URL template");
	Ok(template
		.replace("{z}", &coord.level.to_string())
		.replace("{x}", &coord.x.to_string())
		.replace("{y}", &coord.y.to_string()))
}

/// Path fragment of a tile inside the disk cache: `z<z>x<x>y<y>.{mvt|png}`.
pub fn disk_sub_path(coord: &TileCoord, tile_type: TileType) -> Result<String> {
	ensure!(coord.is_valid(), "invalid coordinate {coord:?} for disk path");
	Ok(format!("{}.{}", coord.file_stem(), tile_type.extension()))
}
