//! Data-driven style expressions.
//!
//! An expression is a nested JSON array whose head names an operator.
//! Evaluation is pure: the same `(expression, feature, zooms)` input always
//! produces the same [`StyleValue`], and nothing is mutated. Type
//! mismatches never abort a frame; the offending operator resolves to
//! [`StyleValue::Null`] and the renderer treats the property as absent.
//!
//! At stylesheet parse time [`validate`] rejects unknown operators so a bad
//! document fails at startup rather than drawing nothing at runtime.

use crate::StyleValue;
use anyhow::{Result, bail};
use vectormap_core::json::JsonValue;
use vectormap_geometry::FeatureMeta;

/// The closed operator set.
const OPERATORS: &[&str] = &[
	"all",
	"case",
	"coalesce",
	"==",
	"!=",
	"<",
	">",
	"<=",
	">=",
	"get",
	"has",
	"in",
	"interpolate",
	"match",
	"zoom",
];

/// Everything an expression may look at.
pub struct EvalContext<'a> {
	pub meta: &'a FeatureMeta,
	pub map_zoom: f64,
	pub vp_zoom: f64,
}

impl<'a> EvalContext<'a> {
	#[must_use]
	pub fn new(meta: &'a FeatureMeta, map_zoom: f64, vp_zoom: f64) -> EvalContext<'a> {
		EvalContext {
			meta,
			map_zoom,
			vp_zoom,
		}
	}
}

fn operator_of(json: &JsonValue) -> Option<(&str, &[JsonValue])> {
	let JsonValue::Array(array) = json else {
		return None;
	};
	let Some(JsonValue::String(head)) = array.get(0) else {
		return None;
	};
	if OPERATORS.contains(&head.as_str()) {
		Some((head.as_str(), &array.0[1..]))
	} else {
		None
	}
}

/// Resolves an expression tree against a feature/zoom context.
///
/// Arrays whose head is a known operator are evaluated; every other node
/// is a literal. Unknown operators and type mismatches yield `Null`.
#[must_use]
pub fn eval(json: &JsonValue, ctx: &EvalContext) -> StyleValue {
	let Some((op, args)) = operator_of(json) else {
		return StyleValue::from_literal(json);
	};

	match op {
		"all" => eval_all(args, ctx),
		"case" => eval_case(args, ctx),
		"coalesce" => eval_coalesce(args, ctx),
		"==" | "!=" | "<" | ">" | "<=" | ">=" => eval_compare(op, args, ctx),
		"get" => eval_get(args, ctx),
		"has" => eval_has(args, ctx),
		"in" => eval_in(args, ctx),
		"interpolate" => eval_interpolate(args, ctx),
		"match" => eval_match(args, ctx),
		"zoom" => StyleValue::Number(ctx.vp_zoom),
		_ => StyleValue::Null,
	}
}

/// Parse-time check: an expression-valued property must carry a known
/// operator at its head, and every nested operator array must be valid.
/// Operator-less nested arrays are literals and pass through.
pub fn validate(json: &JsonValue) -> Result<()> {
	let JsonValue::Array(array) = json else {
		return Ok(());
	};
	match array.get(0) {
		Some(JsonValue::String(head)) if OPERATORS.contains(&head.as_str()) => {
			for arg in &array.0[1..] {
				validate_nested(arg)?;
			}
			Ok(())
		}
		Some(JsonValue::String(head)) => bail!("unknown expression operator '{head}'"),
		_ => bail!("expression must start with an operator name"),
	}
}

fn validate_nested(json: &JsonValue) -> Result<()> {
	let JsonValue::Array(array) = json else {
		return Ok(());
	};
	if operator_of(json).is_some() {
		for arg in &array.0[1..] {
			validate_nested(arg)?;
		}
	}
	Ok(())
}

fn eval_all(args: &[JsonValue], ctx: &EvalContext) -> StyleValue {
	for arg in args {
		if !eval(arg, ctx).is_true() {
			return StyleValue::Bool(false);
		}
	}
	StyleValue::Bool(true)
}

fn eval_case(args: &[JsonValue], ctx: &EvalContext) -> StyleValue {
	let mut pairs = args.chunks_exact(2);
	for pair in pairs.by_ref() {
		if eval(&pair[0], ctx).is_true() {
			return eval(&pair[1], ctx);
		}
	}
	match pairs.remainder() {
		[default] => eval(default, ctx),
		_ => StyleValue::Null,
	}
}

fn eval_coalesce(args: &[JsonValue], ctx: &EvalContext) -> StyleValue {
	for arg in args {
		let value = eval(arg, ctx);
		if !value.is_null() {
			return value;
		}
	}
	StyleValue::Null
}

fn eval_compare(op: &str, args: &[JsonValue], ctx: &EvalContext) -> StyleValue {
	if args.len() != 2 {
		return StyleValue::Null;
	}
	let left = eval(&args[0], ctx);
	let right = eval(&args[1], ctx);

	let ordering = match (&left, &right) {
		(StyleValue::Number(a), StyleValue::Number(b)) => a.partial_cmp(b),
		(StyleValue::String(a), StyleValue::String(b)) => Some(a.cmp(b)),
		(StyleValue::Bool(a), StyleValue::Bool(b)) => Some(a.cmp(b)),
		// mixed-type comparisons are false, never an error
		_ => None,
	};

	let Some(ordering) = ordering else {
		return StyleValue::Bool(false);
	};

	StyleValue::Bool(match op {
		"==" => ordering.is_eq(),
		"!=" => ordering.is_ne(),
		"<" => ordering.is_lt(),
		">" => ordering.is_gt(),
		"<=" => ordering.is_le(),
		">=" => ordering.is_ge(),
		_ => return StyleValue::Null,
	})
}

fn eval_get(args: &[JsonValue], ctx: &EvalContext) -> StyleValue {
	let Some(key) = args.first().map(|arg| eval(arg, ctx)) else {
		return StyleValue::Null;
	};
	let Some(key) = key.as_str().map(str::to_string) else {
		return StyleValue::Null;
	};
	ctx.meta.get(&key).map_or(StyleValue::Null, StyleValue::from)
}

fn eval_has(args: &[JsonValue], ctx: &EvalContext) -> StyleValue {
	let Some(key) = args.first().map(|arg| eval(arg, ctx)) else {
		return StyleValue::Null;
	};
	match key.as_str() {
		Some(key) => StyleValue::Bool(ctx.meta.contains_key(key)),
		None => StyleValue::Null,
	}
}

fn eval_in(args: &[JsonValue], ctx: &EvalContext) -> StyleValue {
	if args.len() != 2 {
		return StyleValue::Null;
	}
	let needle = eval(&args[0], ctx);
	match eval(&args[1], ctx) {
		StyleValue::Array(haystack) => StyleValue::Bool(haystack.contains(&needle)),
		_ => StyleValue::Null,
	}
}

fn eval_match(args: &[JsonValue], ctx: &EvalContext) -> StyleValue {
	if args.is_empty() {
		return StyleValue::Null;
	}
	let input = eval(&args[0], ctx);

	let mut pairs = args[1..].chunks_exact(2);
	for pair in pairs.by_ref() {
		// match labels are literals, not sub-expressions
		let matches = match StyleValue::from_literal(&pair[0]) {
			StyleValue::Array(labels) => labels.contains(&input),
			label => label == input,
		};
		if matches {
			return eval(&pair[1], ctx);
		}
	}
	match pairs.remainder() {
		[default] => eval(default, ctx),
		_ => StyleValue::Null,
	}
}

fn eval_interpolate(args: &[JsonValue], ctx: &EvalContext) -> StyleValue {
	// ["interpolate", ["linear"|"exponential", base?], input, s1, v1, ...]
	if args.len() < 4 {
		return StyleValue::Null;
	}
	let base = match interpolation_base(&args[0]) {
		Some(base) => base,
		None => return StyleValue::Null,
	};
	let Some(input) = eval(&args[1], ctx).as_number() else {
		return StyleValue::Null;
	};

	let stop_args = &args[2..];
	if stop_args.len() < 2 || stop_args.len() % 2 != 0 {
		return StyleValue::Null;
	}
	let mut stops = Vec::with_capacity(stop_args.len() / 2);
	for pair in stop_args.chunks_exact(2) {
		let JsonValue::Number(position) = &pair[0] else {
			return StyleValue::Null;
		};
		stops.push((*position, &pair[1]));
	}

	// clamp to the ends
	if input <= stops[0].0 {
		return eval(stops[0].1, ctx);
	}
	if input >= stops[stops.len() - 1].0 {
		return eval(stops[stops.len() - 1].1, ctx);
	}

	let upper = stops.iter().position(|(position, _)| input < *position).unwrap();
	let (x0, lower_value) = stops[upper - 1];
	let (x1, upper_value) = stops[upper];
	let t = interpolation_factor(input, x0, x1, base);

	mix(&eval(lower_value, ctx), &eval(upper_value, ctx), t)
}

fn interpolation_base(json: &JsonValue) -> Option<f64> {
	let JsonValue::Array(array) = json else {
		return None;
	};
	match array.get(0) {
		Some(JsonValue::String(kind)) if kind == "linear" => Some(1.0),
		Some(JsonValue::String(kind)) if kind == "exponential" => match array.get(1) {
			Some(JsonValue::Number(base)) => Some(*base),
			// unspecified base behaves linearly
			None => Some(1.0),
			Some(_) => None,
		},
		_ => None,
	}
}

fn interpolation_factor(input: f64, lower: f64, upper: f64, base: f64) -> f64 {
	let range = upper - lower;
	let progress = input - lower;
	if base == 1.0 {
		progress / range
	} else {
		(base.powf(progress) - 1.0) / (base.powf(range) - 1.0)
	}
}

fn mix(lower: &StyleValue, upper: &StyleValue, t: f64) -> StyleValue {
	match (lower, upper) {
		(StyleValue::Number(a), StyleValue::Number(b)) => StyleValue::Number(a + (b - a) * t),
		_ => match (lower.as_color(), upper.as_color()) {
			(Some(a), Some(b)) => StyleValue::Color(a.lerp(&b, t)),
			_ => StyleValue::Null,
		},
	}
}
