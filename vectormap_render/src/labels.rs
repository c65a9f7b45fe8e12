//! Text layout and collision avoidance.
//!
//! Axis-aligned labels (point features) and curved labels (line features)
//! share one viewport-global collision list: a label is committed only if
//! its halo-inflated bounding rectangle overlaps no previously committed
//! label, otherwise it is dropped entirely. Committed labels are queued
//! and painted in a second pass so that label draw order does not depend
//! on tile iteration order.

use crate::painter::{Painter, Rect, TextStyle};
use itertools::Itertools;
use vectormap_geometry::{FeatureMeta, TilePoint};

pub(crate) struct LabelArena {
	collision: Vec<Rect>,
	pending: Vec<PendingLabel>,
}

enum PendingLabel {
	Straight { lines: Vec<PlacedLine>, style: TextStyle },
	Curved { glyphs: Vec<PlacedGlyph>, style: TextStyle },
}

struct PlacedLine {
	text: String,
	x: f64,
	y: f64,
}

struct PlacedGlyph {
	ch: char,
	x: f64,
	y: f64,
	angle_deg: f64,
}

impl LabelArena {
	pub fn new() -> LabelArena {
		LabelArena {
			collision: Vec::new(),
			pending: Vec::new(),
		}
	}

	/// Lays out an axis-aligned label centered on `anchor`, word-wrapped
	/// to `max_width_em` ems. Returns whether the label was committed.
	pub fn add_point_label(
		&mut self,
		metrics: &impl Painter,
		anchor: TilePoint,
		text: &str,
		style: &TextStyle,
		max_width_em: f64,
		letter_spacing_px: f64,
	) -> bool {
		if text.is_empty() {
			return false;
		}

		let lines = wrap_greedy(metrics, text, style.size_px, max_width_em * style.size_px, letter_spacing_px);
		if lines.is_empty() {
			return false;
		}
		let line_height = metrics.line_height(style.size_px);
		let widths = lines
			.iter()
			.map(|line| line_width(metrics, line, style.size_px, letter_spacing_px))
			.collect::<Vec<_>>();
		let max_width = widths.iter().fold(0.0f64, |a, b| a.max(*b));
		let total_height = line_height * lines.len() as f64;

		let bounds = Rect {
			x: anchor[0] - max_width / 2.0,
			y: anchor[1] - total_height / 2.0,
			w: max_width,
			h: total_height,
		}
		.inflated(style.halo_width);

		if self.collides(&bounds) {
			return false;
		}

		let placed = lines
			.into_iter()
			.zip(widths)
			.enumerate()
			.map(|(index, (text, width))| PlacedLine {
				text,
				x: anchor[0] - width / 2.0,
				// baseline sits at 80% of the line box
				y: anchor[1] - total_height / 2.0 + line_height * (index as f64 + 0.8),
			})
			.collect();

		self.collision.push(bounds);
		self.pending.push(PendingLabel::Straight {
			lines: placed,
			style: *style,
		});
		true
	}

	/// Lays out a curved label along `path` (screen coordinates), one
	/// glyph per sampled point. The whole label is abandoned when the
	/// path is too short or bends more than `max_angle_deg` between two
	/// adjacent glyphs; partial labels are never rendered.
	pub fn add_curved_label(
		&mut self,
		metrics: &impl Painter,
		path: &[TilePoint],
		text: &str,
		style: &TextStyle,
		max_angle_deg: f64,
		letter_spacing_px: f64,
	) -> bool {
		if text.is_empty() || path.len() < 2 {
			return false;
		}

		let walker = PathWalker::new(path);
		let label_length = line_width(metrics, text, style.size_px, letter_spacing_px);
		if walker.total() < label_length {
			return false;
		}

		// flip so text reads left-to-right
		let initial_angle = normalize_angle(walker.sample(0.0).1);
		let flipped = initial_angle > 90.0 && initial_angle < 270.0;
		let mut characters = text.chars().collect::<Vec<_>>();
		if flipped {
			characters.reverse();
		}

		let mut glyphs = Vec::with_capacity(characters.len());
		let mut bounds: Option<Rect> = None;
		let mut distance = 0.0;
		let mut previous_angle: Option<f64> = None;

		for ch in characters {
			let (point, angle) = walker.sample(distance);
			if let Some(previous) = previous_angle {
				if angle_delta(angle, previous).abs() > max_angle_deg {
					return false;
				}
			}
			previous_angle = Some(angle);

			glyphs.push(PlacedGlyph {
				ch,
				x: point[0],
				y: point[1],
				angle_deg: if flipped { -angle - 180.0 } else { -angle },
			});

			let glyph_box = Rect {
				x: point[0] - style.size_px / 2.0,
				y: point[1] - style.size_px / 2.0,
				w: style.size_px,
				h: style.size_px,
			};
			bounds = Some(match bounds {
				Some(bounds) => bounds.union(&glyph_box),
				None => glyph_box,
			});

			distance += metrics.glyph_advance(ch, style.size_px);
			if ch != ' ' {
				distance += letter_spacing_px;
			}
		}

		let Some(bounds) = bounds else {
			return false;
		};
		let bounds = bounds.inflated(style.halo_width);
		if self.collides(&bounds) {
			return false;
		}

		self.collision.push(bounds);
		self.pending.push(PendingLabel::Curved { glyphs, style: *style });
		true
	}

	fn collides(&self, rect: &Rect) -> bool {
		self.collision.iter().any(|kept| kept.intersects(rect))
	}

	/// Second pass: paints every committed label.
	pub fn paint(self, painter: &mut impl Painter) {
		for label in self.pending {
			match label {
				PendingLabel::Straight { lines, style } => {
					for line in lines {
						painter.draw_text(&line.text, line.x, line.y, &style);
					}
				}
				PendingLabel::Curved { glyphs, style } => {
					for glyph in glyphs {
						painter.draw_glyph(glyph.ch, glyph.x, glyph.y, glyph.angle_deg, &style);
					}
				}
			}
		}
	}
}

/// Replaces `{key}` tokens with feature metadata values; unknown keys
/// become empty.
pub(crate) fn substitute_tokens(template: &str, meta: &FeatureMeta) -> String {
	let mut out = String::with_capacity(template.len());
	let mut rest = template;
	while let Some(start) = rest.find('{') {
		out.push_str(&rest[..start]);
		match rest[start + 1..].find('}') {
			Some(end) => {
				let key = &rest[start + 1..start + 1 + end];
				if let Some(value) = meta.get(key) {
					out.push_str(&value.to_string());
				}
				rest = &rest[start + end + 2..];
			}
			None => {
				out.push_str(&rest[start..]);
				rest = "";
			}
		}
	}
	out.push_str(rest);
	out
}

fn line_width(metrics: &impl Painter, text: &str, size_px: f64, letter_spacing_px: f64) -> f64 {
	let mut width = 0.0;
	for ch in text.chars() {
		width += metrics.glyph_advance(ch, size_px);
		if ch != ' ' {
			width += letter_spacing_px;
		}
	}
	width
}

/// Greedy word wrap: words are appended to the current line until the
/// next one would overflow `max_line_px`.
fn wrap_greedy(
	metrics: &impl Painter,
	text: &str,
	size_px: f64,
	max_line_px: f64,
	letter_spacing_px: f64,
) -> Vec<String> {
	let mut lines: Vec<String> = Vec::new();
	let mut current = String::new();

	for word in text.split_whitespace() {
		if current.is_empty() {
			current = word.to_string();
			continue;
		}
		let candidate = format!("{current} {word}");
		if line_width(metrics, &candidate, size_px, letter_spacing_px) > max_line_px {
			lines.push(std::mem::take(&mut current));
			current = word.to_string();
		} else {
			current = candidate;
		}
	}
	if !current.is_empty() {
		lines.push(current);
	}
	lines
}

/// Walks a poly-line by cumulative pixel length, sampling position and
/// tangent angle (degrees, screen coordinates) at any distance.
struct PathWalker {
	points: Vec<TilePoint>,
	cumulative: Vec<f64>,
}

impl PathWalker {
	fn new(points: &[TilePoint]) -> PathWalker {
		let mut cumulative = Vec::with_capacity(points.len());
		cumulative.push(0.0);
		for (a, b) in points.iter().tuple_windows() {
			let length = ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt();
			cumulative.push(cumulative.last().unwrap() + length);
		}
		PathWalker {
			points: points.to_vec(),
			cumulative,
		}
	}

	fn total(&self) -> f64 {
		*self.cumulative.last().unwrap()
	}

	fn sample(&self, distance: f64) -> (TilePoint, f64) {
		let distance = distance.clamp(0.0, self.total());
		let segment = self
			.cumulative
			.windows(2)
			.position(|window| distance <= window[1])
			.unwrap_or(self.points.len() - 2);

		let a = self.points[segment];
		let b = self.points[segment + 1];
		let segment_length = self.cumulative[segment + 1] - self.cumulative[segment];
		let t = if segment_length > 0.0 {
			(distance - self.cumulative[segment]) / segment_length
		} else {
			0.0
		};

		let point = [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t];
		let angle = (b[1] - a[1]).atan2(b[0] - a[0]).to_degrees();
		(point, angle)
	}
}

fn normalize_angle(degrees: f64) -> f64 {
	degrees.rem_euclid(360.0)
}

/// Smallest signed difference between two angles, in `[-180, 180]`.
fn angle_delta(a: f64, b: f64) -> f64 {
	(a - b + 180.0).rem_euclid(360.0) - 180.0
}
