//! Style properties: constants, zoom-stop functions and expressions.

use crate::{EvalContext, StyleValue, color::Color, expression};
use anyhow::{Context, Result, bail, ensure};
use vectormap_core::json::JsonValue;

/// One paint/layout property of a style layer. Stops are resolved against
/// the integer map zoom; expression-valued properties keep their raw tree
/// and are resolved per feature by the evaluator.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleProperty {
	Constant(StyleValue),
	Stops {
		/// Exponential interpolation base; `1` is linear.
		base: f64,
		stops: Vec<(f64, StyleValue)>,
	},
	Expression(JsonValue),
}

/// What `at_zoom` hands back: either a finished value or the expression
/// tree verbatim for the evaluator.
#[derive(Debug, PartialEq)]
pub enum ResolvedProperty<'a> {
	Value(StyleValue),
	Expression(&'a JsonValue),
}

impl StyleProperty {
	/// Parses a property value from its stylesheet JSON node.
	///
	/// Objects with a `stops` array become zoom functions, arrays must be
	/// valid expressions, everything else is a constant.
	pub fn parse(json: &JsonValue) -> Result<StyleProperty> {
		match json {
			JsonValue::Object(object) => {
				let stops_json = object
					.get_array("stops")
					.context("invalid stops")?
					.ok_or_else(|| anyhow::anyhow!("zoom function must carry a 'stops' array"))?;
				let base = object.get_number("base").context("invalid base")?.unwrap_or(1.0);
				ensure!(base > 0.0, "interpolation base must be positive");

				let mut stops = Vec::with_capacity(stops_json.len());
				for stop in stops_json.iter() {
					let pair = stop.as_array().context("each stop must be a [zoom, value] pair")?;
					ensure!(pair.len() == 2, "each stop must be a [zoom, value] pair");
					let zoom = pair.0[0].as_number().context("stop zoom must be a number")?;
					if let Some((previous, _)) = stops.last() {
						ensure!(zoom > *previous, "stop zooms must be strictly increasing");
					}
					stops.push((zoom, StyleValue::from_literal(&pair.0[1])));
				}
				ensure!(!stops.is_empty(), "zoom function must carry at least one stop");
				Ok(StyleProperty::Stops { base, stops })
			}
			JsonValue::Array(_) => {
				expression::validate(json)?;
				Ok(StyleProperty::Expression(json.clone()))
			}
			JsonValue::Null => bail!("property value must not be null"),
			_ => Ok(StyleProperty::Constant(StyleValue::from_literal(json))),
		}
	}

	/// Same as [`parse`](Self::parse) but substitutes `default` when the
	/// stylesheet omits the property.
	pub fn parse_or<T>(json: Option<&JsonValue>, default: T) -> Result<StyleProperty>
	where
		StyleValue: From<T>,
	{
		match json {
			Some(json) => StyleProperty::parse(json),
			None => Ok(StyleProperty::Constant(StyleValue::from(default))),
		}
	}

	/// Resolves the property at a zoom: constants pass through, stops
	/// interpolate (linearly for numbers, componentwise for colors, step
	/// for anything discrete), expressions are returned verbatim.
	#[must_use]
	pub fn at_zoom(&self, zoom: f64) -> ResolvedProperty<'_> {
		match self {
			StyleProperty::Constant(value) => ResolvedProperty::Value(value.clone()),
			StyleProperty::Stops { base, stops } => ResolvedProperty::Value(interpolate_stops(*base, stops, zoom)),
			StyleProperty::Expression(json) => ResolvedProperty::Expression(json),
		}
	}

	/// Fully resolves the property for one feature: stops use the map
	/// zoom, expressions run through the evaluator.
	#[must_use]
	pub fn resolve(&self, ctx: &EvalContext) -> StyleValue {
		match self.at_zoom(ctx.map_zoom) {
			ResolvedProperty::Value(value) => value,
			ResolvedProperty::Expression(json) => expression::eval(json, ctx),
		}
	}

	#[must_use]
	pub fn resolve_number(&self, ctx: &EvalContext, default: f64) -> f64 {
		self.resolve(ctx).as_number().unwrap_or(default)
	}

	#[must_use]
	pub fn resolve_color(&self, ctx: &EvalContext, default: Color) -> Color {
		self.resolve(ctx).as_color().unwrap_or(default)
	}

	#[must_use]
	pub fn resolve_string(&self, ctx: &EvalContext) -> Option<String> {
		match self.resolve(ctx) {
			StyleValue::String(text) => Some(text),
			_ => None,
		}
	}
}

fn interpolate_stops(base: f64, stops: &[(f64, StyleValue)], zoom: f64) -> StyleValue {
	if zoom <= stops[0].0 {
		return stops[0].1.clone();
	}
	let last = stops.len() - 1;
	if zoom >= stops[last].0 {
		return stops[last].1.clone();
	}

	let upper = stops.iter().position(|(position, _)| zoom < *position).unwrap();
	let (z0, lower_value) = &stops[upper - 1];
	let (z1, upper_value) = &stops[upper];

	let t = if base == 1.0 {
		(zoom - z0) / (z1 - z0)
	} else {
		(base.powf(zoom - z0) - 1.0) / (base.powf(z1 - z0) - 1.0)
	};

	match (lower_value, upper_value) {
		(StyleValue::Number(a), StyleValue::Number(b)) => StyleValue::Number(a + (b - a) * t),
		_ => match (lower_value.as_color(), upper_value.as_color()) {
			(Some(a), Some(b)) => StyleValue::Color(a.lerp(&b, t)),
			// discrete values step at the upper stop
			_ => lower_value.clone(),
		},
	}
}
