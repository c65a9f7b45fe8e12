//! Viewport mathematics: which tiles intersect the view, and where each
//! tile lands on screen.

use std::collections::BTreeSet;
use vectormap_core::{MAX_ZOOM, TileCoord};

use crate::painter::Rect;

/// Nominal pixel size of one tile at integer zoom; the world is
/// `256 · 2^zoom` pixels wide at viewport zoom `zoom`.
pub const TILE_BASE_PX: f64 = 256.0;

/// A window into the world, centered at `(x, y)` in normalized world
/// coordinates (`[0,1]²`), zoomed fractionally.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
	pub x: f64,
	pub y: f64,
	pub zoom: f64,
	pub width_px: f64,
	pub height_px: f64,
}

impl Viewport {
	#[must_use]
	pub fn new(x: f64, y: f64, zoom: f64, width_px: f64, height_px: f64) -> Viewport {
		Viewport {
			x,
			y,
			zoom,
			width_px,
			height_px,
		}
	}

	#[must_use]
	pub fn aspect(&self) -> f64 {
		self.width_px / self.height_px
	}

	/// Tiles of the given level whose unit square intersects this
	/// viewport.
	#[must_use]
	pub fn visible_tiles(&self, map_zoom: u8) -> BTreeSet<TileCoord> {
		calc_visible_tiles(self.x, self.y, self.aspect(), self.zoom, map_zoom)
	}

	/// Size of the whole world in pixels at this viewport's zoom.
	#[must_use]
	pub fn world_px(&self) -> f64 {
		TILE_BASE_PX * self.zoom.exp2()
	}

	/// Screen rectangle a tile occupies.
	#[must_use]
	pub fn tile_rect(&self, coord: &TileCoord) -> Rect {
		let world = self.world_px();
		let size = world / f64::from(coord.grid_size());
		let [origin_x, origin_y] = coord.world_origin();
		Rect {
			x: (origin_x - self.x) * world + self.width_px / 2.0,
			y: (origin_y - self.y) * world + self.height_px / 2.0,
			w: size,
			h: size,
		}
	}

	/// Maps a normalized world position to screen pixels.
	#[must_use]
	pub fn world_to_screen(&self, world_x: f64, world_y: f64) -> [f64; 2] {
		let world = self.world_px();
		[
			(world_x - self.x) * world + self.width_px / 2.0,
			(world_y - self.y) * world + self.height_px / 2.0,
		]
	}
}

/// Computes the set of tile coordinates at `map_zoom` whose unit square
/// intersects the viewport rectangle.
///
/// The viewport half-extents in world units are
/// `e_w = 2^-zoom · min(1, 1/aspect) / 2` and
/// `e_h = 2^-zoom · max(1, aspect) / 2`; the covered tile range is the
/// clamped half-open index interval `[⌊lo·N⌋, ⌈hi·N⌉)` per axis, so tiles
/// touched only on their boundary are not included.
#[must_use]
pub fn calc_visible_tiles(vp_x: f64, vp_y: f64, aspect: f64, vp_zoom: f64, map_zoom: u8) -> BTreeSet<TileCoord> {
	let map_zoom = map_zoom.min(MAX_ZOOM);
	let scale = (-vp_zoom).exp2();
	let half_w = scale * 1f64.min(1.0 / aspect) / 2.0;
	let half_h = scale * 1f64.max(aspect) / 2.0;

	let n = f64::from(1u32 << map_zoom);
	let max_index = (1u32 << map_zoom) - 1;

	let range = |center: f64, half: f64| -> Option<(u32, u32)> {
		let lo = ((center - half) * n).floor();
		let hi = ((center + half) * n).ceil() - 1.0;
		if hi < 0.0 || lo > f64::from(max_index) {
			return None;
		}
		Some((lo.max(0.0) as u32, (hi.min(f64::from(max_index))) as u32))
	};

	let mut tiles = BTreeSet::new();
	let (Some((x0, x1)), Some((y0, y1))) = (range(vp_x, half_w), range(vp_y, half_h)) else {
		return tiles;
	};
	for x in x0..=x1 {
		for y in y0..=y1 {
			// indices are clamped into the grid, construction cannot fail
			tiles.insert(TileCoord::new(map_zoom, x, y).unwrap());
		}
	}
	tiles
}

#[cfg(test)]
mod tests {
	use super::*;

	fn coords(set: &BTreeSet<TileCoord>) -> Vec<(u8, u32, u32)> {
		set.iter().map(|c| (c.level, c.x, c.y)).collect()
	}

	#[test]
	fn centered_square_viewport() {
		let tiles = calc_visible_tiles(0.5, 0.5, 1.0, 2.0, 2);
		assert_eq!(
			coords(&tiles),
			vec![(2, 1, 1), (2, 1, 2), (2, 2, 1), (2, 2, 2)]
		);
	}

	#[test]
	fn world_view_covers_everything() {
		let tiles = calc_visible_tiles(0.5, 0.5, 1.0, 0.0, 1);
		assert_eq!(tiles.len(), 4);
	}

	#[test]
	fn zoomed_in_view_is_a_single_tile() {
		// deep zoom near a tile center touches exactly one tile
		let tiles = calc_visible_tiles(0.126, 0.126, 1.0, 6.0, 2);
		assert_eq!(coords(&tiles), vec![(2, 0, 0)]);
	}

	#[test]
	fn off_world_viewport_is_empty() {
		assert!(calc_visible_tiles(-2.0, 0.5, 1.0, 3.0, 3).is_empty());
		assert!(calc_visible_tiles(0.5, 4.0, 1.0, 3.0, 3).is_empty());
	}

	#[test]
	fn ranges_clamp_to_the_grid() {
		// viewport hanging over the left/top world edge
		let tiles = calc_visible_tiles(0.0, 0.0, 1.0, 1.0, 2);
		for coord in &tiles {
			assert!(coord.is_valid());
		}
		assert!(tiles.contains(&TileCoord::new(2, 0, 0).unwrap()));
	}

	#[test]
	fn tile_rect_tiles_the_screen() {
		let viewport = Viewport::new(0.5, 0.5, 2.0, 512.0, 512.0);
		// at zoom 2 the world is 1024 px; each level-2 tile is 256 px and
		// the four tiles of the S4 visible set exactly tile the screen
		let rect = viewport.tile_rect(&TileCoord::new(2, 1, 1).unwrap());
		assert_eq!((rect.x, rect.y, rect.w, rect.h), (0.0, 0.0, 256.0, 256.0));
		let rect = viewport.tile_rect(&TileCoord::new(2, 2, 2).unwrap());
		assert_eq!((rect.x, rect.y, rect.w, rect.h), (256.0, 256.0, 256.0, 256.0));
	}

	#[test]
	fn world_to_screen_is_consistent_with_tile_rect() {
		let viewport = Viewport::new(0.5, 0.5, 2.0, 512.0, 512.0);
		assert_eq!(viewport.world_to_screen(0.5, 0.5), [256.0, 256.0]);
		assert_eq!(viewport.world_to_screen(0.25, 0.5), [0.0, 256.0]);
	}
}
