//! Scalar-to-color mapping used for point clouds without a native color channel.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::model::bounds::{find_height_bounds, HeightBounds};

#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
	/// Blue, green, red.
	#[default]
	Default,
	/// HSV sweep over the 0..270 degree arc.
	Rainbow,
	/// Blue, cyan, green, yellow, red, white.
	Elevation,
}

const BLUE: [f64; 3] = [0.0, 0.0, 1.0];
const CYAN: [f64; 3] = [0.0, 1.0, 1.0];
const GREEN: [f64; 3] = [0.0, 1.0, 0.0];
const YELLOW: [f64; 3] = [1.0, 1.0, 0.0];
const RED: [f64; 3] = [1.0, 0.0, 0.0];
const WHITE: [f64; 3] = [1.0, 1.0, 1.0];

// (band start, start color, end color), each band 0.2 wide
const ELEVATION_BANDS: [(f64, [f64; 3], [f64; 3]); 5] = [
	(0.0, BLUE, CYAN),
	(0.2, CYAN, GREEN),
	(0.4, GREEN, YELLOW),
	(0.6, YELLOW, RED),
	(0.8, RED, WHITE),
];

impl Palette {
	/// Color for a normalized scalar `t` in `[0, 1]`.
	pub fn color_at(self, t: f64) -> [f32; 3] {
		let rgb = match self {
			Palette::Default => {
				if t < 0.5 {
					[0.0, 2.0 * t, 1.0 - 2.0 * t]
				} else {
					[2.0 * (t - 0.5), 1.0 - 2.0 * (t - 0.5), 0.0]
				}
			}
			Palette::Rainbow => hsv_to_rgb((1.0 - t) * 270.0 / 360.0, 1.0, 1.0),
			Palette::Elevation => {
				let band = if t < 0.2 {
					0
				} else if t < 0.4 {
					1
				} else if t < 0.6 {
					2
				} else if t < 0.8 {
					3
				} else {
					4
				};
				let (start, from, to) = ELEVATION_BANDS[band];
				lerp(from, to, (t - start) * 5.0)
			}
		};
		rgb.map(|c| c.clamp(0.0, 1.0) as f32)
	}
}

fn lerp(from: [f64; 3], to: [f64; 3], f: f64) -> [f64; 3] {
	[
		from[0] + (to[0] - from[0]) * f,
		from[1] + (to[1] - from[1]) * f,
		from[2] + (to[2] - from[2]) * f,
	]
}

/// `h`, `s` and `v` all in `[0, 1]`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f64; 3] {
	let i = (h * 6.0).floor();
	let f = h * 6.0 - i;
	let p = v * (1.0 - s);
	let q = v * (1.0 - f * s);
	let t = v * (1.0 - (1.0 - f) * s);

	match (i as i64).rem_euclid(6) {
		0 => [v, t, p],
		1 => [q, v, p],
		2 => [p, v, t],
		3 => [p, q, v],
		4 => [t, p, v],
		_ => [v, p, q],
	}
}

/// Maps `value` into `[0, 1]` against `bounds`. Flat or missing ranges map to 0.
pub fn normalize(value: f64, bounds: Option<HeightBounds>) -> f64 {
	match bounds {
		Some(bounds) if bounds.span() > 0.0 => {
			let t = (value - bounds.min) / bounds.span();
			if t.is_finite() {
				t.clamp(0.0, 1.0)
			} else {
				0.0
			}
		}
		_ => 0.0,
	}
}

/// One RGB triple per value, normalized against the extrema of `values` itself.
pub fn colormap(values: &[f64], palette: Palette) -> Vec<[f32; 3]> {
	let bounds = find_height_bounds(values);
	values
		.iter()
		.map(|&value| palette.color_at(normalize(value, bounds)))
		.collect()
}
