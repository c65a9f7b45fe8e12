//! The drawing seam between the renderer and its host.
//!
//! [`Painter`] is deliberately narrow: state push/pop, a clip rectangle,
//! filled and stroked paths in screen coordinates, raster blits, glyph
//! output and font metrics. The renderer is generic over any
//! implementation, which keeps it host-free; [`RecordingPainter`] captures
//! draw calls as typed events with deterministic metrics so tests can
//! assert on exactly what would have been drawn.

use image::RgbaImage;
use vectormap_geometry::TilePath;
use vectormap_style::Color;

/// Axis-aligned screen rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
	pub x: f64,
	pub y: f64,
	pub w: f64,
	pub h: f64,
}

impl Rect {
	#[must_use]
	pub fn new(x: f64, y: f64, w: f64, h: f64) -> Rect {
		Rect { x, y, w, h }
	}

	#[must_use]
	pub fn intersects(&self, other: &Rect) -> bool {
		self.x < other.x + other.w && other.x < self.x + self.w && self.y < other.y + other.h && other.y < self.y + self.h
	}

	/// Grows the rectangle by `amount` on every side.
	#[must_use]
	pub fn inflated(&self, amount: f64) -> Rect {
		Rect {
			x: self.x - amount,
			y: self.y - amount,
			w: self.w + 2.0 * amount,
			h: self.h + 2.0 * amount,
		}
	}

	/// Smallest rectangle covering both.
	#[must_use]
	pub fn union(&self, other: &Rect) -> Rect {
		let x = self.x.min(other.x);
		let y = self.y.min(other.y);
		Rect {
			x,
			y,
			w: (self.x + self.w).max(other.x + other.w) - x,
			h: (self.y + self.h).max(other.y + other.h) - y,
		}
	}
}

/// Stroke parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pen {
	pub color: Color,
	pub width: f64,
}

/// Resolved per-label text parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
	pub size_px: f64,
	pub color: Color,
	pub halo_color: Color,
	pub halo_width: f64,
}

pub trait Painter {
	fn save(&mut self);
	fn restore(&mut self);
	fn set_clip(&mut self, rect: &Rect);

	fn fill_rect(&mut self, rect: &Rect, color: Color);
	/// Fills a set of rings with the non-zero winding rule.
	fn fill_path(&mut self, paths: &[TilePath], color: Color);
	fn stroke_path(&mut self, paths: &[TilePath], pen: &Pen);
	fn draw_raster(&mut self, image: &RgbaImage, rect: &Rect, opacity: f64);

	/// Draws one line of text with its baseline starting at `(x, y)`.
	fn draw_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle);
	/// Draws one glyph rotated by `angle_deg` around its baseline origin.
	fn draw_glyph(&mut self, ch: char, x: f64, y: f64, angle_deg: f64, style: &TextStyle);

	/// Horizontal advance of a glyph at the given pixel size.
	fn glyph_advance(&self, ch: char, size_px: f64) -> f64;
	/// Vertical distance between two baselines at the given pixel size.
	fn line_height(&self, size_px: f64) -> f64;
}

/// One captured draw call.
#[derive(Clone, Debug, PartialEq)]
pub enum PaintEvent {
	Save,
	Restore,
	Clip(Rect),
	FillRect {
		rect: Rect,
		color: Color,
	},
	FillPath {
		paths: Vec<TilePath>,
		color: Color,
	},
	StrokePath {
		paths: Vec<TilePath>,
		pen: Pen,
	},
	Raster {
		rect: Rect,
		opacity: f64,
	},
	Text {
		text: String,
		x: f64,
		y: f64,
		style: TextStyle,
	},
	Glyph {
		ch: char,
		x: f64,
		y: f64,
		angle_deg: f64,
	},
}

/// Captures draw calls instead of rasterizing. Metrics are synthetic and
/// deterministic: every glyph advances `0.6 · size`, lines are
/// `1.2 · size` apart.
#[derive(Default)]
pub struct RecordingPainter {
	pub events: Vec<PaintEvent>,
}

impl RecordingPainter {
	#[must_use]
	pub fn new() -> RecordingPainter {
		RecordingPainter::default()
	}

	/// Convenience view over the captured text events.
	#[must_use]
	pub fn texts(&self) -> Vec<&str> {
		self
			.events
			.iter()
			.filter_map(|event| match event {
				PaintEvent::Text { text, .. } => Some(text.as_str()),
				_ => None,
			})
			.collect()
	}

	#[must_use]
	pub fn count(&self, probe: fn(&PaintEvent) -> bool) -> usize {
		self.events.iter().filter(|event| probe(event)).count()
	}
}

impl Painter for RecordingPainter {
	fn save(&mut self) {
		self.events.push(PaintEvent::Save);
	}

	fn restore(&mut self) {
		self.events.push(PaintEvent::Restore);
	}

	fn set_clip(&mut self, rect: &Rect) {
		self.events.push(PaintEvent::Clip(*rect));
	}

	fn fill_rect(&mut self, rect: &Rect, color: Color) {
		self.events.push(PaintEvent::FillRect { rect: *rect, color });
	}

	fn fill_path(&mut self, paths: &[TilePath], color: Color) {
		self.events.push(PaintEvent::FillPath {
			paths: paths.to_vec(),
			color,
		});
	}

	fn stroke_path(&mut self, paths: &[TilePath], pen: &Pen) {
		self.events.push(PaintEvent::StrokePath {
			paths: paths.to_vec(),
			pen: *pen,
		});
	}

	fn draw_raster(&mut self, _image: &RgbaImage, rect: &Rect, opacity: f64) {
		self.events.push(PaintEvent::Raster { rect: *rect, opacity });
	}

	fn draw_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) {
		self.events.push(PaintEvent::Text {
			text: text.to_string(),
			x,
			y,
			style: *style,
		});
	}

	fn draw_glyph(&mut self, ch: char, x: f64, y: f64, angle_deg: f64, _style: &TextStyle) {
		self.events.push(PaintEvent::Glyph { ch, x, y, angle_deg });
	}

	fn glyph_advance(&self, _ch: char, size_px: f64) -> f64 {
		0.6 * size_px
	}

	fn line_height(&self, size_px: f64) -> f64 {
		1.2 * size_px
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rect_intersection() {
		let a = Rect::new(0.0, 0.0, 10.0, 10.0);
		assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
		assert!(!a.intersects(&Rect::new(10.0, 0.0, 5.0, 5.0))); // touching is not intersecting
		assert!(!a.intersects(&Rect::new(-20.0, 0.0, 5.0, 5.0)));
	}

	#[test]
	fn rect_inflate_and_union() {
		let rect = Rect::new(2.0, 3.0, 4.0, 5.0).inflated(1.0);
		assert_eq!(rect, Rect::new(1.0, 2.0, 6.0, 7.0));

		let union = Rect::new(0.0, 0.0, 2.0, 2.0).union(&Rect::new(5.0, 1.0, 2.0, 4.0));
		assert_eq!(union, Rect::new(0.0, 0.0, 7.0, 5.0));
	}

	#[test]
	fn recording_metrics_are_deterministic() {
		let painter = RecordingPainter::new();
		assert_eq!(painter.glyph_advance('M', 16.0), 9.6);
		assert_eq!(painter.glyph_advance('i', 16.0), 9.6);
		assert_eq!(painter.line_height(10.0), 12.0);
	}

	#[test]
	fn events_capture_draw_calls() {
		let mut painter = RecordingPainter::new();
		painter.save();
		painter.set_clip(&Rect::new(0.0, 0.0, 256.0, 256.0));
		painter.fill_rect(&Rect::new(0.0, 0.0, 256.0, 256.0), vectormap_style::color::WHITE);
		painter.restore();
		assert_eq!(painter.events.len(), 4);
		assert_eq!(painter.count(|e| matches!(e, PaintEvent::FillRect { .. })), 1);
	}
}
