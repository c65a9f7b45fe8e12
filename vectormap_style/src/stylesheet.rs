//! Stylesheet documents.
//!
//! A stylesheet is an ordered list of layer styles, painted back-to-front
//! in array order. Parsing is strict: unknown layer types, unknown
//! expression operators or missing required fields fail the whole
//! document, and a partial stylesheet is never surfaced.

use crate::{StyleProperty, expression};
use anyhow::{Context, Result, bail, ensure};
use vectormap_core::json::{JsonObject, JsonValue};

const DEFAULT_MIN_ZOOM: f64 = 0.0;
const DEFAULT_MAX_ZOOM: f64 = 24.0;

#[derive(Clone, Debug)]
pub struct StyleSheet {
	pub layers: Vec<StyleLayer>,
}

#[derive(Clone, Debug)]
pub struct StyleLayer {
	pub id: String,
	/// Source layer this style reads from; `None` for backgrounds and
	/// raster layers.
	pub source_layer: Option<String>,
	pub min_zoom: f64,
	pub max_zoom: f64,
	/// Validated filter expression; a feature is drawn when it evaluates
	/// to true (or no filter is present).
	pub filter: Option<JsonValue>,
	pub kind: StyleLayerKind,
}

/// The closed set of layer treatments.
#[derive(Clone, Debug)]
pub enum StyleLayerKind {
	Background(BackgroundStyle),
	Fill(FillStyle),
	Line(LineStyle),
	Symbol(SymbolStyle),
	Raster(RasterStyle),
}

#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	pub color: StyleProperty,
	pub opacity: StyleProperty,
}

#[derive(Clone, Debug)]
pub struct FillStyle {
	pub color: StyleProperty,
	pub opacity: StyleProperty,
}

#[derive(Clone, Debug)]
pub struct LineStyle {
	pub color: StyleProperty,
	pub width: StyleProperty,
	pub opacity: StyleProperty,
}

#[derive(Clone, Debug)]
pub struct SymbolStyle {
	/// Label text; `{key}` tokens are substituted from feature metadata.
	pub text_field: StyleProperty,
	pub text_size: StyleProperty,
	pub text_color: StyleProperty,
	pub text_opacity: StyleProperty,
	pub halo_color: StyleProperty,
	pub halo_width: StyleProperty,
	/// Maximum tangent change between adjacent glyphs of a curved label,
	/// in degrees.
	pub max_angle: StyleProperty,
	/// Additional advance between glyphs, in ems.
	pub letter_spacing: StyleProperty,
	/// Wrap width for axis-aligned labels, in ems.
	pub max_width: StyleProperty,
	/// Font stack pass-through; the painter picks the closest face.
	pub font: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct RasterStyle {
	pub opacity: StyleProperty,
}

impl StyleLayer {
	#[must_use]
	pub fn visible_at(&self, zoom: f64) -> bool {
		zoom >= self.min_zoom && zoom <= self.max_zoom
	}
}

impl StyleSheet {
	/// Parses a stylesheet document from JSON text.
	pub fn parse(json: &str) -> Result<StyleSheet> {
		let document = JsonValue::parse_str(json).context("invalid stylesheet: malformed JSON")?;
		StyleSheet::from_json(&document)
	}

	pub fn from_json(document: &JsonValue) -> Result<StyleSheet> {
		let object = document.as_object().context("invalid stylesheet: document must be an object")?;
		let layers_json = object
			.get_array("layers")
			.context("invalid stylesheet")?
			.ok_or_else(|| anyhow::anyhow!("invalid stylesheet: missing 'layers'"))?;

		let mut layers = Vec::with_capacity(layers_json.len());
		for layer_json in layers_json.iter() {
			let layer = parse_layer(layer_json.as_object().context("invalid stylesheet: layer must be an object")?);
			layers.push(layer.with_context(|| {
				format!(
					"invalid stylesheet: layer '{}'",
					layer_json
						.as_object()
						.ok()
						.and_then(|o| o.get_string("id").ok().flatten())
						.unwrap_or_else(|| String::from("<unnamed>"))
				)
			})?);
		}

		Ok(StyleSheet { layers })
	}
}

fn parse_layer(object: &JsonObject) -> Result<StyleLayer> {
	let id = object
		.get_string("id")?
		.ok_or_else(|| anyhow::anyhow!("missing required field 'id'"))?;
	let layer_type = object
		.get_string("type")?
		.ok_or_else(|| anyhow::anyhow!("missing required field 'type'"))?;

	let source_layer = object.get_string("source-layer")?;
	let min_zoom = object.get_number("minzoom")?.unwrap_or(DEFAULT_MIN_ZOOM);
	let max_zoom = object.get_number("maxzoom")?.unwrap_or(DEFAULT_MAX_ZOOM);
	ensure!(min_zoom <= max_zoom, "minzoom must not exceed maxzoom");

	let filter = match object.get("filter") {
		Some(filter) => {
			expression::validate(filter).context("invalid filter")?;
			Some(filter.clone())
		}
		None => None,
	};

	let empty = JsonObject::new();
	let paint = object.get_object("paint")?.unwrap_or(&empty);
	let layout = object.get_object("layout")?.unwrap_or(&empty);

	let kind = match layer_type.as_str() {
		"background" => StyleLayerKind::Background(BackgroundStyle {
			color: StyleProperty::parse_or(paint.get("background-color"), "#000000")?,
			opacity: StyleProperty::parse_or(paint.get("background-opacity"), 1.0)?,
		}),
		"fill" => StyleLayerKind::Fill(FillStyle {
			color: StyleProperty::parse_or(paint.get("fill-color"), "#000000")?,
			opacity: StyleProperty::parse_or(paint.get("fill-opacity"), 1.0)?,
		}),
		"line" => StyleLayerKind::Line(LineStyle {
			color: StyleProperty::parse_or(paint.get("line-color"), "#000000")?,
			width: StyleProperty::parse_or(paint.get("line-width"), 1.0)?,
			opacity: StyleProperty::parse_or(paint.get("line-opacity"), 1.0)?,
		}),
		"symbol" => StyleLayerKind::Symbol(SymbolStyle {
			text_field: StyleProperty::parse_or(layout.get("text-field"), "")?,
			text_size: StyleProperty::parse_or(layout.get("text-size"), 16.0)?,
			text_color: StyleProperty::parse_or(paint.get("text-color"), "#000000")?,
			text_opacity: StyleProperty::parse_or(paint.get("text-opacity"), 1.0)?,
			halo_color: StyleProperty::parse_or(paint.get("text-halo-color"), "rgba(0,0,0,0)")?,
			halo_width: StyleProperty::parse_or(paint.get("text-halo-width"), 0.0)?,
			max_angle: StyleProperty::parse_or(layout.get("text-max-angle"), 45.0)?,
			letter_spacing: StyleProperty::parse_or(layout.get("text-letter-spacing"), 0.0)?,
			max_width: StyleProperty::parse_or(layout.get("text-max-width"), 10.0)?,
			font: layout
				.get_array("text-font")
				.context("invalid text-font")?
				.map(|array| array.as_string_vec())
				.transpose()
				.context("invalid text-font")?,
		}),
		"raster" => StyleLayerKind::Raster(RasterStyle {
			opacity: StyleProperty::parse_or(paint.get("raster-opacity"), 1.0)?,
		}),
		other => bail!("unknown layer type '{other}'"),
	};

	// vector treatments cannot work without a source layer to read from
	if matches!(
		kind,
		StyleLayerKind::Fill(_) | StyleLayerKind::Line(_) | StyleLayerKind::Symbol(_)
	) {
		ensure!(source_layer.is_some(), "missing required field 'source-layer'");
	}

	Ok(StyleLayer {
		id,
		source_layer,
		min_zoom,
		max_zoom,
		filter,
		kind,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{EvalContext, StyleValue, color::Color, expression::eval};
	use vectormap_geometry::{FeatureMeta, TagValue};

	const DOCUMENT: &str = r##"{
		"version": 8,
		"layers": [
			{"id": "bg", "type": "background", "paint": {"background-color": "#e0dfdf"}},
			{
				"id": "water",
				"type": "fill",
				"source-layer": "water",
				"paint": {"fill-color": "#aad3df", "fill-opacity": {"stops": [[0, 0.5], [10, 1.0]]}}
			},
			{
				"id": "roads",
				"type": "line",
				"source-layer": "transportation",
				"minzoom": 4,
				"maxzoom": 15,
				"filter": ["==", ["get", "class"], "motorway"],
				"paint": {
					"line-color": ["match", ["get", "class"], "motorway", "#f00", "#000"],
					"line-width": {"stops": [[5, 1], [15, 11]]}
				}
			},
			{
				"id": "labels",
				"type": "symbol",
				"source-layer": "place",
				"layout": {"text-field": "{name}", "text-size": 14, "text-max-angle": 30},
				"paint": {"text-color": "#333", "text-halo-color": "#fff", "text-halo-width": 1.5}
			},
			{"id": "hillshade", "type": "raster", "paint": {"raster-opacity": 0.6}}
		]
	}"##;

	#[test]
	fn parses_ordered_layers() -> Result<()> {
		let sheet = StyleSheet::parse(DOCUMENT)?;
		let ids = sheet.layers.iter().map(|l| l.id.as_str()).collect::<Vec<_>>();
		assert_eq!(ids, vec!["bg", "water", "roads", "labels", "hillshade"]);
		Ok(())
	}

	#[test]
	fn zoom_windows() -> Result<()> {
		let sheet = StyleSheet::parse(DOCUMENT)?;
		let roads = &sheet.layers[2];
		assert!(!roads.visible_at(3.0));
		assert!(roads.visible_at(4.0));
		assert!(roads.visible_at(15.0));
		assert!(!roads.visible_at(15.5));
		// defaults are wide open
		assert!(sheet.layers[0].visible_at(0.0));
		assert!(sheet.layers[0].visible_at(24.0));
		Ok(())
	}

	#[test]
	fn typed_kinds_and_properties() -> Result<()> {
		let sheet = StyleSheet::parse(DOCUMENT)?;
		let meta = FeatureMeta::from(vec![("class", TagValue::from("motorway"))]);
		let ctx = EvalContext::new(&meta, 10.0, 10.0);

		let StyleLayerKind::Line(line) = &sheet.layers[2].kind else {
			panic!("expected a line layer")
		};
		assert_eq!(line.color.resolve_color(&ctx, Color::rgb(0.0, 0.0, 0.0)), Color::rgb(1.0, 0.0, 0.0));
		assert_eq!(line.width.resolve_number(&ctx, 0.0), 6.0);

		let StyleLayerKind::Symbol(symbol) = &sheet.layers[3].kind else {
			panic!("expected a symbol layer")
		};
		assert_eq!(symbol.text_size.resolve_number(&ctx, 0.0), 14.0);
		assert_eq!(symbol.max_angle.resolve_number(&ctx, 0.0), 30.0);
		// defaults fill the gaps
		assert_eq!(symbol.letter_spacing.resolve_number(&ctx, -1.0), 0.0);
		assert_eq!(symbol.max_width.resolve_number(&ctx, -1.0), 10.0);
		Ok(())
	}

	#[test]
	fn filter_drives_feature_visibility() -> Result<()> {
		let sheet = StyleSheet::parse(DOCUMENT)?;
		let filter = sheet.layers[2].filter.as_ref().unwrap();

		let motorway = FeatureMeta::from(vec![("class", TagValue::from("motorway"))]);
		let path = FeatureMeta::from(vec![("class", TagValue::from("path"))]);
		assert_eq!(eval(filter, &EvalContext::new(&motorway, 10.0, 10.0)), StyleValue::Bool(true));
		assert_eq!(eval(filter, &EvalContext::new(&path, 10.0, 10.0)), StyleValue::Bool(false));
		Ok(())
	}

	#[test]
	fn rejects_bad_documents() {
		for bad in [
			// not JSON
			"{",
			// missing layers
			r#"{"version": 8}"#,
			// missing id
			r#"{"layers": [{"type": "fill", "source-layer": "x"}]}"#,
			// missing type
			r#"{"layers": [{"id": "a"}]}"#,
			// unknown type
			r#"{"layers": [{"id": "a", "type": "extrusion"}]}"#,
			// missing source-layer on a vector treatment
			r#"{"layers": [{"id": "a", "type": "fill"}]}"#,
			// unknown operator in a property
			r#"{"layers": [{"id": "a", "type": "fill", "source-layer": "x", "paint": {"fill-color": ["frobnicate"]}}]}"#,
			// unknown operator in a filter
			r#"{"layers": [{"id": "a", "type": "fill", "source-layer": "x", "filter": ["frobnicate", 1]}]}"#,
			// inverted zoom window
			r#"{"layers": [{"id": "a", "type": "background", "minzoom": 9, "maxzoom": 3}]}"#,
		] {
			assert!(StyleSheet::parse(bad).is_err(), "should reject {bad}");
		}
	}
}
