use serde::Serialize;

use crate::colormap::{colormap, Palette};
use crate::model::bounds::{find_height_bounds, HeightBounds};
use crate::reader::records::Delimiter;

/// Which of the two PCD strategies produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
	/// Header scan plus whitespace tokenizing of an ASCII data section.
	Text,
	/// Full decode through `pcd-rs`.
	Delegate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
	Delimited { delimiter: Delimiter },
	Pcd { tier: Tier },
}

/// One exported row: position plus 0-255 color.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct SourceRow {
	pub x: f32,
	pub y: f32,
	pub z: f32,
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

/// A parsed point cloud. Built once through [`RecordBuilder`], never mutated.
///
/// `positions` and `colors` are flat `[x0, y0, z0, x1, ...]` buffers of equal
/// length; `z_values` and `source_rows` hold one entry per point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudRecord {
	positions: Vec<f32>,
	colors: Vec<f32>,
	z_values: Vec<f64>,
	source_rows: Vec<SourceRow>,
	has_explicit_color: bool,
	bounds: HeightBounds,
	skipped_rows: usize,
	origin: Origin,
}

impl PointCloudRecord {
	pub fn positions(&self) -> &[f32] {
		&self.positions
	}

	pub fn colors(&self) -> &[f32] {
		&self.colors
	}

	pub fn z_values(&self) -> &[f64] {
		&self.z_values
	}

	pub fn source_rows(&self) -> &[SourceRow] {
		&self.source_rows
	}

	pub fn has_explicit_color(&self) -> bool {
		self.has_explicit_color
	}

	/// Extrema of this record's `z_values`.
	pub fn height_bounds(&self) -> HeightBounds {
		self.bounds
	}

	/// Rows dropped while parsing (non-finite coordinates, too few fields).
	pub fn skipped_rows(&self) -> usize {
		self.skipped_rows
	}

	pub fn origin(&self) -> Origin {
		self.origin
	}

	pub fn len(&self) -> usize {
		self.z_values.len()
	}

	/// Always false for a constructed record; kept for API symmetry with `len`.
	pub fn is_empty(&self) -> bool {
		self.z_values.is_empty()
	}

	/// Copy holding only the points with `min <= z <= max`, or `None` if none are left.
	pub fn filter_by_height(&self, min: f64, max: f64) -> Option<PointCloudRecord> {
		let range = HeightBounds::new(min, max);
		let mut positions = Vec::new();
		let mut colors = Vec::new();
		let mut z_values = Vec::new();

		for (i, &z) in self.z_values.iter().enumerate() {
			if range.contains(z) {
				positions.extend_from_slice(&self.positions[i * 3..i * 3 + 3]);
				colors.extend_from_slice(&self.colors[i * 3..i * 3 + 3]);
				z_values.push(z);
			}
		}

		PointCloudRecord::from_parts(
			positions,
			colors,
			z_values,
			self.has_explicit_color,
			self.skipped_rows,
			self.origin,
		)
	}

	fn from_parts(
		positions: Vec<f32>,
		colors: Vec<f32>,
		z_values: Vec<f64>,
		has_explicit_color: bool,
		skipped_rows: usize,
		origin: Origin,
	) -> Option<PointCloudRecord> {
		if positions.len() != z_values.len() * 3 || colors.len() != positions.len() {
			return None;
		}

		let bounds = find_height_bounds(&z_values)?;
		let source_rows = positions
			.chunks_exact(3)
			.zip(colors.chunks_exact(3))
			.map(|(p, c)| SourceRow {
				x: p[0],
				y: p[1],
				z: p[2],
				r: to_byte(c[0]),
				g: to_byte(c[1]),
				b: to_byte(c[2]),
			})
			.collect();

		Some(PointCloudRecord {
			positions,
			colors,
			z_values,
			source_rows,
			has_explicit_color,
			bounds,
			skipped_rows,
			origin,
		})
	}
}

/// `[0, 1]` color channel to its nearest 0-255 integer.
pub fn to_byte(c: f32) -> u8 {
	(c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// 0-255 channel value to `[0, 1]`. NaN becomes mid gray.
pub fn normalize_channel(value: f64) -> f32 {
	let value = if value.is_nan() { 128.0 } else { value };
	(value.clamp(0.0, 255.0) / 255.0) as f32
}

/// Where the colors of a finished record come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorFill {
	/// Pushed per point alongside the positions.
	Explicit,
	Colormap(Palette),
	Constant([f32; 3]),
}

/// Accumulates validated points for one file.
#[derive(Debug, Default)]
pub struct RecordBuilder {
	positions: Vec<f32>,
	colors: Vec<f32>,
	z_values: Vec<f64>,
	skipped: usize,
}

impl RecordBuilder {
	pub fn with_capacity(points: usize) -> RecordBuilder {
		RecordBuilder {
			positions: Vec::with_capacity(points.saturating_mul(3)),
			colors: Vec::new(),
			z_values: Vec::with_capacity(points),
			skipped: 0,
		}
	}

	/// Accepts the point if all three coordinates are finite, otherwise counts it as skipped.
	pub fn push_point(&mut self, position: [f64; 3]) -> bool {
		match to_position(position) {
			Some(p) => {
				self.positions.extend_from_slice(&p);
				self.z_values.push(position[2]);
				true
			}
			None => {
				self.skipped += 1;
				false
			}
		}
	}

	pub fn push_colored(&mut self, position: [f64; 3], color: [f32; 3]) -> bool {
		let accepted = self.push_point(position);
		if accepted {
			self.colors.extend_from_slice(&color);
		}
		accepted
	}

	pub fn skip(&mut self) {
		self.skipped += 1;
	}

	pub fn len(&self) -> usize {
		self.z_values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.z_values.is_empty()
	}

	pub fn skipped(&self) -> usize {
		self.skipped
	}

	/// `None` when no point was accepted, or when `Explicit` colors were not
	/// pushed for every point.
	pub fn finish(self, fill: ColorFill, origin: Origin) -> Option<PointCloudRecord> {
		if self.is_empty() {
			return None;
		}

		let (colors, has_explicit_color) = match fill {
			ColorFill::Explicit => (self.colors, true),
			ColorFill::Colormap(palette) => (
				colormap(&self.z_values, palette).into_iter().flatten().collect(),
				false,
			),
			ColorFill::Constant(color) => (color.repeat(self.z_values.len()), false),
		};

		PointCloudRecord::from_parts(
			self.positions,
			colors,
			self.z_values,
			has_explicit_color,
			self.skipped,
			origin,
		)
	}
}

fn to_position([x, y, z]: [f64; 3]) -> Option<[f32; 3]> {
	let p = [x as f32, y as f32, z as f32];
	if p.iter().all(|c| c.is_finite()) {
		Some(p)
	} else {
		None
	}
}
