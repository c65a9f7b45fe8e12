//! CPU rasterizing painter backed by `tiny-skia`, with `fontdue` glyphs.
//!
//! This is the painter a host embeds when it wants pixels rather than a
//! recorded draw list. Text halos are drawn by blitting the glyph
//! coverage in eight directions with the halo color before the glyph
//! itself; curved glyphs rotate around their baseline origin.

use crate::painter::{Painter, Pen, Rect, TextStyle};
use anyhow::{Result, anyhow};
use fontdue::Font;
use image::RgbaImage;
use log::warn;
use tiny_skia::{FillRule, Mask, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform};
use vectormap_geometry::TilePath;
use vectormap_style::Color;

pub struct PixmapPainter {
	pixmap: Pixmap,
	font: Option<Font>,
	clip: Option<Mask>,
	saved: Vec<Option<Mask>>,
}

impl PixmapPainter {
	pub fn new(width: u32, height: u32) -> Result<PixmapPainter> {
		Ok(PixmapPainter {
			pixmap: Pixmap::new(width, height).ok_or_else(|| anyhow!("invalid pixmap size {width}x{height}"))?,
			font: None,
			clip: None,
			saved: Vec::new(),
		})
	}

	/// Attaches a font face for text output; without one, text calls are
	/// skipped but metrics still return usable fallbacks.
	pub fn with_font(mut self, font_bytes: &[u8]) -> Result<PixmapPainter> {
		let font = Font::from_bytes(font_bytes, fontdue::FontSettings::default())
			.map_err(|err| anyhow!("failed to load font: {err}"))?;
		self.font = Some(font);
		Ok(self)
	}

	#[must_use]
	pub fn pixmap(&self) -> &Pixmap {
		&self.pixmap
	}

	#[must_use]
	pub fn into_pixmap(self) -> Pixmap {
		self.pixmap
	}

	fn paint_for(color: Color) -> Paint<'static> {
		let mut paint = Paint::default();
		paint.set_color(skia_color(color));
		paint.anti_alias = true;
		paint
	}

	fn blit_glyph(&mut self, ch: char, x: f64, y: f64, angle_deg: f64, size_px: f64, color: Color) {
		let Some(font) = &self.font else {
			return;
		};
		let (metrics, coverage) = font.rasterize(ch, size_px as f32);
		if metrics.width == 0 || metrics.height == 0 {
			return;
		}

		let Some(mut glyph) = Pixmap::new(metrics.width as u32, metrics.height as u32) else {
			return;
		};
		let rgba = color.to_rgba8();
		for (pixel, alpha) in glyph.pixels_mut().iter_mut().zip(&coverage) {
			let alpha = f32::from(*alpha) / 255.0 * color.a;
			// premultiplied, as tiny-skia expects; pixels start transparent
			if let Some(premultiplied) = tiny_skia::PremultipliedColorU8::from_rgba(
				(f32::from(rgba[0]) * alpha) as u8,
				(f32::from(rgba[1]) * alpha) as u8,
				(f32::from(rgba[2]) * alpha) as u8,
				(alpha * 255.0) as u8,
			) {
				*pixel = premultiplied;
			}
		}

		let glyph_x = (x + f64::from(metrics.xmin)) as i32;
		let glyph_y = (y - f64::from(metrics.height as i32 + metrics.ymin)) as i32;
		let transform = if angle_deg == 0.0 {
			Transform::identity()
		} else {
			Transform::from_rotate_at(angle_deg as f32, x as f32, y as f32)
		};
		self.pixmap.draw_pixmap(
			glyph_x,
			glyph_y,
			glyph.as_ref(),
			&PixmapPaint::default(),
			transform,
			self.clip.as_ref(),
		);
	}

	fn draw_glyph_with_halo(&mut self, ch: char, x: f64, y: f64, angle_deg: f64, style: &TextStyle) {
		if style.halo_width > 0.0 && style.halo_color.a > 0.0 {
			let w = style.halo_width;
			for (dx, dy) in [
				(-w, 0.0),
				(w, 0.0),
				(0.0, -w),
				(0.0, w),
				(-w, -w),
				(-w, w),
				(w, -w),
				(w, w),
			] {
				self.blit_glyph(ch, x + dx, y + dy, angle_deg, style.size_px, style.halo_color);
			}
		}
		self.blit_glyph(ch, x, y, angle_deg, style.size_px, style.color);
	}
}

fn skia_color(color: Color) -> tiny_skia::Color {
	tiny_skia::Color::from_rgba(
		color.r.clamp(0.0, 1.0),
		color.g.clamp(0.0, 1.0),
		color.b.clamp(0.0, 1.0),
		color.a.clamp(0.0, 1.0),
	)
	.unwrap_or(tiny_skia::Color::TRANSPARENT)
}

fn build_path(paths: &[TilePath]) -> Option<tiny_skia::Path> {
	let mut builder = PathBuilder::new();
	for path in paths {
		if path.len() < 2 {
			continue;
		}
		builder.move_to(path[0][0] as f32, path[0][1] as f32);
		for point in &path[1..] {
			builder.line_to(point[0] as f32, point[1] as f32);
		}
	}
	builder.finish()
}

impl Painter for PixmapPainter {
	fn save(&mut self) {
		self.saved.push(self.clip.clone());
	}

	fn restore(&mut self) {
		match self.saved.pop() {
			Some(clip) => self.clip = clip,
			None => warn!("restore without a matching save"),
		}
	}

	fn set_clip(&mut self, rect: &Rect) {
		let mut mask = match Mask::new(self.pixmap.width(), self.pixmap.height()) {
			Some(mask) => mask,
			None => return,
		};
		if let Some(skia_rect) =
			tiny_skia::Rect::from_xywh(rect.x as f32, rect.y as f32, rect.w as f32, rect.h as f32)
		{
			let path = PathBuilder::from_rect(skia_rect);
			mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
			self.clip = Some(mask);
		}
	}

	fn fill_rect(&mut self, rect: &Rect, color: Color) {
		let Some(skia_rect) = tiny_skia::Rect::from_xywh(rect.x as f32, rect.y as f32, rect.w as f32, rect.h as f32)
		else {
			return;
		};
		self
			.pixmap
			.fill_rect(skia_rect, &Self::paint_for(color), Transform::identity(), self.clip.as_ref());
	}

	fn fill_path(&mut self, paths: &[TilePath], color: Color) {
		let Some(path) = build_path(paths) else {
			return;
		};
		self.pixmap.fill_path(
			&path,
			&Self::paint_for(color),
			// non-zero winding keeps polygon holes empty
			FillRule::Winding,
			Transform::identity(),
			self.clip.as_ref(),
		);
	}

	fn stroke_path(&mut self, paths: &[TilePath], pen: &Pen) {
		let Some(path) = build_path(paths) else {
			return;
		};
		let stroke = Stroke {
			width: pen.width as f32,
			..Stroke::default()
		};
		self.pixmap.stroke_path(
			&path,
			&Self::paint_for(pen.color),
			&stroke,
			Transform::identity(),
			self.clip.as_ref(),
		);
	}

	fn draw_raster(&mut self, image: &RgbaImage, rect: &Rect, opacity: f64) {
		let Some(size) = tiny_skia::IntSize::from_wh(image.width(), image.height()) else {
			return;
		};
		// straight alpha → premultiplied
		let mut data = image.as_raw().clone();
		for pixel in data.chunks_exact_mut(4) {
			let alpha = u16::from(pixel[3]);
			pixel[0] = ((u16::from(pixel[0]) * alpha) / 255) as u8;
			pixel[1] = ((u16::from(pixel[1]) * alpha) / 255) as u8;
			pixel[2] = ((u16::from(pixel[2]) * alpha) / 255) as u8;
		}
		let Some(source) = Pixmap::from_vec(data, size) else {
			return;
		};

		let paint = PixmapPaint {
			opacity: opacity.clamp(0.0, 1.0) as f32,
			..PixmapPaint::default()
		};
		let transform = Transform::from_row(
			(rect.w / f64::from(image.width())) as f32,
			0.0,
			0.0,
			(rect.h / f64::from(image.height())) as f32,
			rect.x as f32,
			rect.y as f32,
		);
		self
			.pixmap
			.draw_pixmap(0, 0, source.as_ref(), &paint, transform, self.clip.as_ref());
	}

	fn draw_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) {
		let mut cursor = x;
		for ch in text.chars() {
			self.draw_glyph_with_halo(ch, cursor, y, 0.0, style);
			cursor += self.glyph_advance(ch, style.size_px);
		}
	}

	fn draw_glyph(&mut self, ch: char, x: f64, y: f64, angle_deg: f64, style: &TextStyle) {
		self.draw_glyph_with_halo(ch, x, y, angle_deg, style);
	}

	fn glyph_advance(&self, ch: char, size_px: f64) -> f64 {
		match &self.font {
			Some(font) => f64::from(font.metrics(ch, size_px as f32).advance_width),
			None => 0.6 * size_px,
		}
	}

	fn line_height(&self, size_px: f64) -> f64 {
		self
			.font
			.as_ref()
			.and_then(|font| font.horizontal_line_metrics(size_px as f32))
			.map_or(1.2 * size_px, |metrics| f64::from(metrics.new_line_size))
	}
}
