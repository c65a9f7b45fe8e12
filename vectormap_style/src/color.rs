//! Style colors in straight (non-premultiplied) sRGB.

use anyhow::{Result, bail, ensure};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: f32,
	pub g: f32,
	pub b: f32,
	pub a: f32,
}

pub const TRANSPARENT: Color = Color {
	r: 0.0,
	g: 0.0,
	b: 0.0,
	a: 0.0,
};
pub const BLACK: Color = Color {
	r: 0.0,
	g: 0.0,
	b: 0.0,
	a: 1.0,
};
pub const WHITE: Color = Color {
	r: 1.0,
	g: 1.0,
	b: 1.0,
	a: 1.0,
};

impl Color {
	#[must_use]
	pub fn rgb(r: f32, g: f32, b: f32) -> Color {
		Color { r, g, b, a: 1.0 }
	}

	#[must_use]
	pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Color {
		Color { r, g, b, a }
	}

	/// Parses `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)` and
	/// `rgba(r,g,b,a)` (byte channels, fractional alpha).
	pub fn parse(text: &str) -> Result<Color> {
		let text = text.trim();
		if let Some(hex) = text.strip_prefix('#') {
			return Color::parse_hex(hex);
		}
		if let Some(body) = text.strip_prefix("rgba(").and_then(|t| t.strip_suffix(')')) {
			let parts = split_numbers(body)?;
			ensure!(parts.len() == 4, "rgba() needs four components: '{text}'");
			return Ok(Color::rgba(
				(parts[0] / 255.0) as f32,
				(parts[1] / 255.0) as f32,
				(parts[2] / 255.0) as f32,
				parts[3] as f32,
			));
		}
		if let Some(body) = text.strip_prefix("rgb(").and_then(|t| t.strip_suffix(')')) {
			let parts = split_numbers(body)?;
			ensure!(parts.len() == 3, "rgb() needs three components: '{text}'");
			return Ok(Color::rgb(
				(parts[0] / 255.0) as f32,
				(parts[1] / 255.0) as f32,
				(parts[2] / 255.0) as f32,
			));
		}
		bail!("unsupported color syntax '{text}'")
	}

	fn parse_hex(hex: &str) -> Result<Color> {
		let nibble = |index: usize| -> Result<u32> {
			let c = hex.as_bytes()[index] as char;
			c.to_digit(16).ok_or_else(|| anyhow::anyhow!("invalid hex digit '{c}'"))
		};
		let byte = |index: usize| -> Result<f32> { Ok(((nibble(index)? * 16 + nibble(index + 1)?) as f32) / 255.0) };

		match hex.len() {
			3 => Ok(Color::rgb(
				(nibble(0)? * 17) as f32 / 255.0,
				(nibble(1)? * 17) as f32 / 255.0,
				(nibble(2)? * 17) as f32 / 255.0,
			)),
			6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
			8 => Ok(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
			_ => bail!("hex color must have 3, 6 or 8 digits: '#{hex}'"),
		}
	}

	/// Componentwise sRGB interpolation; `t` is clamped to `[0, 1]`.
	#[must_use]
	pub fn lerp(&self, other: &Color, t: f64) -> Color {
		let t = t.clamp(0.0, 1.0) as f32;
		let mix = |a: f32, b: f32| a + (b - a) * t;
		Color {
			r: mix(self.r, other.r),
			g: mix(self.g, other.g),
			b: mix(self.b, other.b),
			a: mix(self.a, other.a),
		}
	}

	/// Multiplies the alpha channel, used for paint opacity.
	#[must_use]
	pub fn with_opacity(&self, opacity: f64) -> Color {
		Color {
			a: self.a * (opacity.clamp(0.0, 1.0) as f32),
			..*self
		}
	}

	#[must_use]
	pub fn to_rgba8(&self) -> [u8; 4] {
		let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
		[channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
	}
}

fn split_numbers(body: &str) -> Result<Vec<f64>> {
	body
		.split(',')
		.map(|part| {
			part
				.trim()
				.parse::<f64>()
				.map_err(|_| anyhow::anyhow!("invalid color component '{}'", part.trim()))
		})
		.collect()
}
