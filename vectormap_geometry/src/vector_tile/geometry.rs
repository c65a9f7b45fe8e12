//! Decoded tile-local geometry.
//!
//! Coordinates are in tile-local units (`[0, extent]`, extent 4096 unless
//! the layer declares otherwise). The renderer scales them by
//! `1/extent · tile_size` into the tile's screen rectangle.

use anyhow::{Result, bail, ensure};

pub type TilePoint = [f64; 2];
/// One poly-line or one polygon ring (rings are stored closed).
pub type TilePath = Vec<TilePoint>;

/// The closed set of feature shapes the renderer draws. Wire features with
/// an unknown geometry type are discarded during layer decode and never
/// reach this enum.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureGeometry {
	/// Filled shape: rings in wire order, exterior first, then its holes.
	/// Filling with the non-zero winding rule renders holes correctly
	/// without grouping rings into polygons.
	Polygon(Vec<TilePath>),
	Line(Vec<TilePath>),
	Point(Vec<TilePoint>),
}

impl FeatureGeometry {
	/// Validates the shape-specific invariants the decoder relies on.
	pub fn check(&self) -> Result<()> {
		match self {
			FeatureGeometry::Point(points) => {
				ensure!(!points.is_empty(), "point features must carry at least one point");
			}
			FeatureGeometry::Line(lines) => {
				ensure!(!lines.is_empty(), "line features must carry at least one path");
				for line in lines {
					ensure!(line.len() >= 2, "each line must carry at least two points");
				}
			}
			FeatureGeometry::Polygon(rings) => {
				ensure!(!rings.is_empty(), "polygon features must carry at least one ring");
				for ring in rings {
					ensure!(ring.len() >= 4, "each ring must carry at least four points (A,B,C,A)");
					ensure!(ring.first() == ring.last(), "rings must be closed");
				}
				if let Some(first) = rings.first() {
					if ring_area(first) < 0.0 {
						bail!("first polygon ring must be an exterior ring");
					}
				}
			}
		}
		Ok(())
	}
}

/// Signed area of a ring; positive for exterior rings in the wire
/// format's y-down coordinate system.
#[must_use]
pub fn ring_area(ring: &[TilePoint]) -> f64 {
	let mut sum = 0.0;
	for i in 0..ring.len().saturating_sub(1) {
		let [x0, y0] = ring[i];
		let [x1, y1] = ring[i + 1];
		sum += (y1 + y0) * (x1 - x0);
	}
	sum / 2.0
}
