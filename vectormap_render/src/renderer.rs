//! The style-directed tile draw loop.
//!
//! `paint_tiles` walks the visible tiles, and inside each tile the
//! stylesheet's layers in paint order (array order, back to front):
//! backgrounds fill the tile rectangle, fills and lines transform feature
//! paths by `1/extent · tile_size` into the clipped tile rectangle, raster
//! layers blit the decoded image, and symbol layers feed the label
//! pipeline. Labels are collision-checked against a viewport-global list
//! and painted in a second pass so their draw order is independent of tile
//! iteration order. Per-feature errors never abort a frame: unresolvable
//! properties fall back to defaults or skip the feature.

use crate::{
	labels::{LabelArena, substitute_tokens},
	painter::{Painter, Pen, Rect, TextStyle},
	viewport::Viewport,
};
use vectormap_geometry::{FeatureGeometry, FeatureMeta, TileLayer, TilePath, TilePoint};
use vectormap_loader::TileSnapshot;
use vectormap_style::{
	EvalContext, FillStyle, LineStyle, StyleLayer, StyleLayerKind, StyleSheet, SymbolStyle, color, eval,
};

/// Which coordinate anchors a label when a point feature carries more
/// than one point. `Second` preserves the long-standing behavior of
/// picking index 1; `First` is the obvious choice for new styles.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PointAnchor {
	First,
	#[default]
	Second,
}

/// Renderer policy knobs.
#[derive(Clone, Copy, Debug, Default)]
pub struct PaintSetup {
	pub point_anchor: PointAnchor,
}

/// Paints one frame: every visible tile, every style layer, every
/// matching feature.
pub fn paint_tiles(
	painter: &mut impl Painter,
	viewport: &Viewport,
	map_zoom: u8,
	tiles: &TileSnapshot,
	sheet: &StyleSheet,
	setup: &PaintSetup,
) {
	let mut labels = LabelArena::new();
	let no_meta = FeatureMeta::new();

	for coord in viewport.visible_tiles(map_zoom) {
		let tile_rect = viewport.tile_rect(&coord);
		let vector_tile = tiles.vector.get(&coord);

		painter.save();
		painter.set_clip(&tile_rect);

		for layer in &sheet.layers {
			if !layer.visible_at(f64::from(map_zoom)) {
				continue;
			}

			match &layer.kind {
				StyleLayerKind::Background(background) => {
					let ctx = EvalContext::new(&no_meta, f64::from(map_zoom), viewport.zoom);
					let fill = background
						.color
						.resolve_color(&ctx, color::BLACK)
						.with_opacity(background.opacity.resolve_number(&ctx, 1.0));
					painter.fill_rect(&tile_rect, fill);
				}
				StyleLayerKind::Raster(raster) => {
					if let Some(image) = tiles.raster.get(&coord) {
						let ctx = EvalContext::new(&no_meta, f64::from(map_zoom), viewport.zoom);
						painter.draw_raster(image, &tile_rect, raster.opacity.resolve_number(&ctx, 1.0));
					}
				}
				StyleLayerKind::Fill(fill) => {
					if let Some(source) = source_layer(layer, vector_tile) {
						paint_fill_layer(painter, viewport, map_zoom, layer, fill, source, &tile_rect);
					}
				}
				StyleLayerKind::Line(line) => {
					if let Some(source) = source_layer(layer, vector_tile) {
						paint_line_layer(painter, viewport, map_zoom, layer, line, source, &tile_rect);
					}
				}
				StyleLayerKind::Symbol(symbol) => {
					if let Some(source) = source_layer(layer, vector_tile) {
						queue_symbol_layer(
							&mut labels,
							&*painter,
							viewport,
							map_zoom,
							layer,
							symbol,
							source,
							&tile_rect,
							setup,
						);
					}
				}
			}
		}

		painter.restore();
	}

	// second pass: committed labels, unclipped and in commit order
	labels.paint(painter);
}

/// Looks the style's source layer up in the tile, if the tile is loaded.
fn source_layer<'a>(layer: &StyleLayer, tile: Option<&'a std::sync::Arc<vectormap_geometry::VectorTile>>) -> Option<&'a TileLayer> {
	tile?.layer(layer.source_layer.as_deref()?)
}

fn feature_passes(layer: &StyleLayer, ctx: &EvalContext) -> bool {
	layer.filter.as_ref().is_none_or(|filter| eval(filter, ctx).is_true())
}

/// Transforms a tile-local path into the tile's screen rectangle.
fn to_screen(paths: &[TilePath], extent: u32, tile_rect: &Rect) -> Vec<TilePath> {
	let scale = tile_rect.w / f64::from(extent);
	paths
		.iter()
		.map(|path| {
			path
				.iter()
				.map(|point| [tile_rect.x + point[0] * scale, tile_rect.y + point[1] * scale])
				.collect()
		})
		.collect()
}

fn point_to_screen(point: &TilePoint, extent: u32, tile_rect: &Rect) -> TilePoint {
	let scale = tile_rect.w / f64::from(extent);
	[tile_rect.x + point[0] * scale, tile_rect.y + point[1] * scale]
}

fn paint_fill_layer(
	painter: &mut impl Painter,
	viewport: &Viewport,
	map_zoom: u8,
	layer: &StyleLayer,
	fill: &FillStyle,
	source: &TileLayer,
	tile_rect: &Rect,
) {
	for feature in &source.features {
		let FeatureGeometry::Polygon(rings) = &feature.geometry else {
			continue;
		};
		let ctx = EvalContext::new(&feature.meta, f64::from(map_zoom), viewport.zoom);
		if !feature_passes(layer, &ctx) {
			continue;
		}
		// color carries the fill opacity as straight alpha
		let fill_color = fill
			.color
			.resolve_color(&ctx, color::BLACK)
			.with_opacity(fill.opacity.resolve_number(&ctx, 1.0));
		painter.fill_path(&to_screen(rings, source.extent, tile_rect), fill_color);
	}
}

fn paint_line_layer(
	painter: &mut impl Painter,
	viewport: &Viewport,
	map_zoom: u8,
	layer: &StyleLayer,
	line: &LineStyle,
	source: &TileLayer,
	tile_rect: &Rect,
) {
	for feature in &source.features {
		let FeatureGeometry::Line(paths) = &feature.geometry else {
			continue;
		};
		let ctx = EvalContext::new(&feature.meta, f64::from(map_zoom), viewport.zoom);
		if !feature_passes(layer, &ctx) {
			continue;
		}
		let pen = Pen {
			color: line
				.color
				.resolve_color(&ctx, color::BLACK)
				.with_opacity(line.opacity.resolve_number(&ctx, 1.0)),
			width: line.width.resolve_number(&ctx, 1.0),
		};
		painter.stroke_path(&to_screen(paths, source.extent, tile_rect), &pen);
	}
}

#[allow(clippy::too_many_arguments)]
fn queue_symbol_layer(
	labels: &mut LabelArena,
	metrics: &impl Painter,
	viewport: &Viewport,
	map_zoom: u8,
	layer: &StyleLayer,
	symbol: &SymbolStyle,
	source: &TileLayer,
	tile_rect: &Rect,
	setup: &PaintSetup,
) {
	for feature in &source.features {
		let ctx = EvalContext::new(&feature.meta, f64::from(map_zoom), viewport.zoom);
		if !feature_passes(layer, &ctx) {
			continue;
		}

		let Some(template) = symbol.text_field.resolve_string(&ctx) else {
			continue;
		};
		let text = substitute_tokens(&template, &feature.meta);
		if text.is_empty() {
			continue;
		}

		let size_px = symbol.text_size.resolve_number(&ctx, 16.0);
		let style = TextStyle {
			size_px,
			color: symbol
				.text_color
				.resolve_color(&ctx, color::BLACK)
				.with_opacity(symbol.text_opacity.resolve_number(&ctx, 1.0)),
			halo_color: symbol.halo_color.resolve_color(&ctx, color::TRANSPARENT),
			halo_width: symbol.halo_width.resolve_number(&ctx, 0.0),
		};
		let letter_spacing_px = symbol.letter_spacing.resolve_number(&ctx, 0.0) * size_px;
		let max_angle_deg = symbol.max_angle.resolve_number(&ctx, 45.0);
		let max_width_em = symbol.max_width.resolve_number(&ctx, 10.0);

		match &feature.geometry {
			FeatureGeometry::Point(points) => {
				let anchor = match setup.point_anchor {
					PointAnchor::Second if points.len() > 1 => points[1],
					_ => points[0],
				};
				let anchor = point_to_screen(&anchor, source.extent, tile_rect);
				labels.add_point_label(metrics, anchor, &text, &style, max_width_em, letter_spacing_px);
			}
			FeatureGeometry::Line(paths) => {
				// one label per feature, along the first path that fits
				for path in to_screen(paths, source.extent, tile_rect) {
					if labels.add_curved_label(metrics, &path, &text, &style, max_angle_deg, letter_spacing_px) {
						break;
					}
				}
			}
			FeatureGeometry::Polygon(_) => {}
		}
	}
}
