use log::debug;
use pcd_rs::{DynReader, Field};

use crate::error::ParseError;
use crate::model::record::{normalize_channel, ColorFill, Origin, PointCloudRecord, RecordBuilder, Tier};

/// Field names that mark a color channel.
const COLOR_FIELDS: [&str; 8] = ["rgb", "rgba", "r", "g", "b", "red", "green", "blue"];

// A PCD header is about a dozen lines; anything longer is not one.
const MAX_HEADER_LINES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEncoding {
	Ascii,
	Binary,
	BinaryCompressed,
	Unknown(String),
}

impl DataEncoding {
	fn parse(token: &str) -> DataEncoding {
		match token.to_ascii_lowercase().as_str() {
			"ascii" => DataEncoding::Ascii,
			"binary" => DataEncoding::Binary,
			"binary_compressed" => DataEncoding::BinaryCompressed,
			other => DataEncoding::Unknown(other.to_string()),
		}
	}
}

/// Declarations scanned from the text header of a PCD file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcdHeader {
	pub fields: Vec<String>,
	pub points: Option<usize>,
	pub data: Option<DataEncoding>,
	/// Byte offset of the first line after `DATA`.
	pub data_offset: usize,
}

impl PcdHeader {
	/// Fails with [`ParseError::InvalidFormat`] unless the `.PCD` marker or a `VERSION` line is present.
	pub fn scan(buf: &[u8]) -> Result<PcdHeader, ParseError> {
		let mut signed = false;
		let mut fields = Vec::new();
		let mut points = None;
		let mut size = (None, None);
		let mut data = None;
		let mut offset = 0;

		for line in buf.split(|&b| b == b'\n').take(MAX_HEADER_LINES) {
			let next = (offset + line.len() + 1).min(buf.len());
			offset = next;

			let line = String::from_utf8_lossy(line);
			let line = line.trim();
			if line.starts_with('#') {
				signed |= line.contains(".PCD");
				continue;
			}

			let mut tokens = line.split_whitespace();
			let key = tokens.next().unwrap_or("").to_ascii_uppercase();
			let values: Vec<&str> = tokens.collect();
			let first = values.first().copied().unwrap_or("");

			match key.as_str() {
				"VERSION" => signed = true,
				"FIELDS" => fields = values.iter().map(|f| f.to_ascii_lowercase()).collect(),
				"POINTS" => points = first.parse().ok(),
				"WIDTH" => size.0 = first.parse::<usize>().ok(),
				"HEIGHT" => size.1 = first.parse::<usize>().ok(),
				"DATA" => {
					data = Some(DataEncoding::parse(first));
					break;
				}
				_ => {}
			}
		}

		if !signed {
			return Err(ParseError::InvalidFormat(
				"missing .PCD marker and VERSION line".to_string(),
			));
		}

		let points = match (points, size) {
			(Some(points), _) => Some(points),
			(None, (Some(width), Some(height))) => match width.checked_mul(height) {
				Some(points) => Some(points),
				None => {
					return Err(ParseError::InvalidFormat(
						"WIDTH * HEIGHT overflows".to_string(),
					))
				}
			},
			_ => None,
		};

		Ok(PcdHeader {
			fields,
			points,
			data,
			data_offset: offset,
		})
	}

	fn starts_with_xyz(&self) -> bool {
		self.fields.len() >= 3 && self.fields[..3].iter().map(String::as_str).eq(["x", "y", "z"])
	}

	fn has_color(&self) -> bool {
		self.fields.iter().any(|f| COLOR_FIELDS.contains(&f.as_str()))
	}

	/// True when columns 3..6 are separate r, g, b channels.
	fn color_columns(&self) -> bool {
		matches!(
			self.fields.get(3..6),
			Some([r, g, b]) if channel_index(r) == Some(0)
				&& channel_index(g) == Some(1)
				&& channel_index(b) == Some(2)
		)
	}
}

fn channel_index(name: &str) -> Option<usize> {
	match name {
		"r" | "red" => Some(0),
		"g" | "green" => Some(1),
		"b" | "blue" => Some(2),
		_ => None,
	}
}

/// Outcome of one parsing tier.
#[derive(Debug)]
pub enum Attempt {
	Parsed(PointCloudRecord),
	/// This tier cannot handle the file; try the next one.
	Defer(&'static str),
}

type TierFn = fn(&[u8], &PcdHeader, [f32; 3]) -> Result<Attempt, ParseError>;

const TIERS: [(Tier, TierFn); 2] = [(Tier::Text, parse_text), (Tier::Delegate, parse_delegate)];

/// Parses a PCD file, trying the text tier first and `pcd-rs` second.
/// Points without color get `fallback_color`.
pub fn from_pcd(buf: &[u8], fallback_color: [f32; 3]) -> Result<PointCloudRecord, ParseError> {
	let header = PcdHeader::scan(buf)?;

	for (tier, attempt) in TIERS {
		match attempt(buf, &header, fallback_color)? {
			Attempt::Parsed(record) => {
				debug!(
					"pcd: {:?} tier parsed {} points ({} skipped)",
					tier,
					record.len(),
					record.skipped_rows()
				);
				return Ok(record);
			}
			Attempt::Defer(reason) => debug!("pcd: {:?} tier deferred: {}", tier, reason),
		}
	}

	Err(ParseError::EmptyPointCloud)
}

/// Whitespace tokenizing of an ASCII data section whose columns start with `x y z`.
pub fn parse_text(
	buf: &[u8],
	header: &PcdHeader,
	fallback_color: [f32; 3],
) -> Result<Attempt, ParseError> {
	if header.data != Some(DataEncoding::Ascii) {
		return Ok(Attempt::Defer("data section is not ascii"));
	}
	let points = match header.points {
		Some(points) if points > 0 => points,
		_ => return Ok(Attempt::Defer("no declared points")),
	};
	if !header.fields.is_empty() && !header.starts_with_xyz() {
		return Ok(Attempt::Defer("fields do not start with x y z"));
	}
	let read_color = header.has_color();
	if read_color && !header.color_columns() {
		return Ok(Attempt::Defer("color is not stored as r g b columns"));
	}

	let body = String::from_utf8_lossy(&buf[header.data_offset..]);
	// the declared count is unchecked, size by what the body can hold
	let mut builder = RecordBuilder::with_capacity(points.min(body.lines().count()));

	for line in body.lines().filter(|line| !line.trim().is_empty()).take(points) {
		let values: Vec<f64> = line
			.split_whitespace()
			.map(|token| token.parse().unwrap_or(f64::NAN))
			.collect();
		if values.len() < 3 {
			builder.skip();
			continue;
		}
		let position = [values[0], values[1], values[2]];

		if read_color {
			if values.len() < 6 {
				builder.skip();
				continue;
			}
			let color = [
				normalize_channel(values[3]),
				normalize_channel(values[4]),
				normalize_channel(values[5]),
			];
			builder.push_colored(position, color);
		} else {
			builder.push_point(position);
		}
	}

	if builder.is_empty() {
		return Ok(Attempt::Defer("no valid points in ascii data"));
	}

	let fill = if read_color {
		ColorFill::Explicit
	} else {
		ColorFill::Constant(fallback_color)
	};
	builder
		.finish(fill, Origin::Pcd { tier: Tier::Text })
		.map(Attempt::Parsed)
		.ok_or(ParseError::EmptyPointCloud)
}

#[derive(Debug, Clone, Copy)]
enum ColorLayout {
	Channels([usize; 3]),
	/// `0x00RRGGBB` in the bits of one field.
	Packed(usize),
	None,
}

impl ColorLayout {
	fn detect(fields: &[String]) -> ColorLayout {
		match (
			position(fields, &["r", "red"]),
			position(fields, &["g", "green"]),
			position(fields, &["b", "blue"]),
		) {
			(Some(r), Some(g), Some(b)) => ColorLayout::Channels([r, g, b]),
			_ => match position(fields, &["rgb", "rgba"]) {
				Some(i) => ColorLayout::Packed(i),
				None => ColorLayout::None,
			},
		}
	}
}

fn position(fields: &[String], names: &[&str]) -> Option<usize> {
	fields.iter().position(|f| names.contains(&f.as_str()))
}

/// Full decode through `pcd-rs`; handles binary data and any field order.
pub fn parse_delegate(
	buf: &[u8],
	_header: &PcdHeader,
	fallback_color: [f32; 3],
) -> Result<Attempt, ParseError> {
	let reader = DynReader::from_bytes(buf).map_err(|err| ParseError::Decode(err.to_string()))?;

	let fields: Vec<String> = reader
		.meta()
		.field_defs
		.fields
		.iter()
		.map(|def| def.name.to_ascii_lowercase())
		.collect();
	let index = |name: &str| fields.iter().position(|f| f == name);
	let [x, y, z] = match [index("x"), index("y"), index("z")] {
		[Some(x), Some(y), Some(z)] => [x, y, z],
		_ => return Err(ParseError::InvalidFormat("missing x, y or z field".to_string())),
	};
	let layout = ColorLayout::detect(&fields);

	let mut builder = RecordBuilder::default();
	for record in reader {
		let record = record.map_err(|err| ParseError::Decode(err.to_string()))?;
		let values = &record.0;
		let position = [scalar(values, x), scalar(values, y), scalar(values, z)];

		match layout {
			ColorLayout::Channels(channels) => {
				builder.push_colored(position, channels.map(|i| channel(values.get(i))));
			}
			ColorLayout::Packed(i) => {
				builder.push_colored(position, unpack_rgb(values.get(i)));
			}
			ColorLayout::None => {
				builder.push_point(position);
			}
		}
	}

	let fill = match layout {
		ColorLayout::None => ColorFill::Constant(fallback_color),
		_ => ColorFill::Explicit,
	};
	builder
		.finish(fill, Origin::Pcd { tier: Tier::Delegate })
		.map(Attempt::Parsed)
		.ok_or(ParseError::EmptyPointCloud)
}

fn scalar(values: &[Field], index: usize) -> f64 {
	values.get(index).and_then(first_value).unwrap_or(f64::NAN)
}

#[allow(unreachable_patterns)]
fn first_value(field: &Field) -> Option<f64> {
	match field {
		Field::I8(v) => v.first().map(|&v| v as f64),
		Field::I16(v) => v.first().map(|&v| v as f64),
		Field::I32(v) => v.first().map(|&v| v as f64),
		Field::U8(v) => v.first().map(|&v| v as f64),
		Field::U16(v) => v.first().map(|&v| v as f64),
		Field::U32(v) => v.first().map(|&v| v as f64),
		Field::F32(v) => v.first().map(|&v| v as f64),
		Field::F64(v) => v.first().copied(),
		_ => None,
	}
}

/// Integer channels are 0-255, float channels are already 0-1.
fn channel(field: Option<&Field>) -> f32 {
	let value = match field {
		Some(Field::F32(v)) => v.first().map_or(f64::NAN, |&v| v as f64 * 255.0),
		Some(Field::F64(v)) => v.first().map_or(f64::NAN, |&v| v * 255.0),
		Some(field) => first_value(field).unwrap_or(f64::NAN),
		None => f64::NAN,
	};
	normalize_channel(value)
}

fn unpack_rgb(field: Option<&Field>) -> [f32; 3] {
	let bits = match field {
		Some(Field::F32(v)) => v.first().map(|v| v.to_bits()),
		Some(Field::U32(v)) => v.first().copied(),
		Some(Field::I32(v)) => v.first().map(|&v| v as u32),
		_ => None,
	};
	match bits {
		Some(bits) => [
			((bits >> 16) & 0xff) as f32 / 255.0,
			((bits >> 8) & 0xff) as f32 / 255.0,
			(bits & 0xff) as f32 / 255.0,
		],
		None => [normalize_channel(f64::NAN); 3],
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use byteorder::{LittleEndian, WriteBytesExt};

	use super::*;

	const GRAY: [f32; 3] = [0.7, 0.7, 0.7];

	fn binary_pcd(fields: &str, types: &str, points: &[([f32; 3], Option<u32>)]) -> Vec<u8> {
		let count = fields.split_whitespace().count();
		let mut buf = format!(
			"# .PCD v0.7 - Point Cloud Data file format\n\
			VERSION 0.7\n\
			FIELDS {}\n\
			SIZE {}\n\
			TYPE {}\n\
			COUNT {}\n\
			WIDTH {}\n\
			HEIGHT 1\n\
			VIEWPOINT 0 0 0 1 0 0 0\n\
			POINTS {}\n\
			DATA binary\n",
			fields,
			vec!["4"; count].join(" "),
			types,
			vec!["1"; count].join(" "),
			points.len(),
			points.len()
		)
		.into_bytes();

		for (position, rgb) in points {
			for c in position {
				buf.write_f32::<LittleEndian>(*c).unwrap();
			}
			if let Some(rgb) = rgb {
				buf.write_u32::<LittleEndian>(*rgb).unwrap();
			}
		}
		buf
	}

	#[test]
	fn test_read_ascii_pcd() -> Result<(), Box<dyn std::error::Error>> {
		let buffer = fs::read("resources/ascii.pcd")?;
		let record = from_pcd(&buffer, GRAY)?;

		assert!(!record.has_explicit_color());
		assert_eq!(record.positions(), &[0.0, 0.0, 0.0, 1.0, 1.0, 2.0]);
		assert_eq!(record.colors(), &[0.7, 0.7, 0.7, 0.7, 0.7, 0.7]);
		assert_eq!(record.z_values(), &[0.0, 2.0]);
		assert_eq!(record.origin(), Origin::Pcd { tier: Tier::Text });
		Ok(())
	}

	#[test]
	fn test_read_ascii_pcd_with_color() -> Result<(), Box<dyn std::error::Error>> {
		let buffer = fs::read("resources/ascii_rgb.pcd")?;
		let record = from_pcd(&buffer, GRAY)?;

		assert!(record.has_explicit_color());
		assert_eq!(record.len(), 3);
		assert_eq!(&record.colors()[..3], &[1.0, 0.0, 0.0]);
		assert_eq!(&record.colors()[6..], &[0.0, 0.0, 1.0]);
		assert_eq!(record.origin(), Origin::Pcd { tier: Tier::Text });
		Ok(())
	}

	#[test]
	fn test_packed_color_goes_to_delegate() -> Result<(), Box<dyn std::error::Error>> {
		let buffer = fs::read("resources/packed_rgb.pcd")?;
		let record = from_pcd(&buffer, GRAY)?;

		assert!(record.has_explicit_color());
		assert_eq!(record.colors(), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
		assert_eq!(record.origin(), Origin::Pcd { tier: Tier::Delegate });
		Ok(())
	}

	#[test]
	fn test_read_binary_pcd() -> Result<(), Box<dyn std::error::Error>> {
		let buffer = binary_pcd(
			"x y z",
			"F F F",
			&[([0.0, 0.0, 0.0], None), ([1.5, -2.0, 3.25], None)],
		);
		let record = from_pcd(&buffer, GRAY)?;

		assert!(!record.has_explicit_color());
		assert_eq!(record.positions(), &[0.0, 0.0, 0.0, 1.5, -2.0, 3.25]);
		assert_eq!(record.colors(), &[0.7, 0.7, 0.7, 0.7, 0.7, 0.7]);
		assert_eq!(record.origin(), Origin::Pcd { tier: Tier::Delegate });
		Ok(())
	}

	#[test]
	fn test_read_binary_pcd_with_packed_color() -> Result<(), Box<dyn std::error::Error>> {
		let buffer = binary_pcd(
			"x y z rgb",
			"F F F U",
			&[
				([0.0, 0.0, 0.0], Some(0x00ff_0000)),
				([1.0, 1.0, 1.0], Some(0x0000_00ff)),
			],
		);
		let record = from_pcd(&buffer, GRAY)?;

		assert!(record.has_explicit_color());
		assert_eq!(record.colors(), &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
		assert_eq!(record.source_rows()[1].b, 255);
		Ok(())
	}

	#[test]
	fn test_ascii_rows_with_nan_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
		let text = "VERSION 0.7\nFIELDS x y z\nPOINTS 3\nDATA ascii\n0 0 nan\n1 2 3\n4 5\n";
		let record = from_pcd(text.as_bytes(), GRAY)?;

		assert_eq!(record.positions(), &[1.0, 2.0, 3.0]);
		assert_eq!(record.skipped_rows(), 2);
		Ok(())
	}

	#[test]
	fn test_ascii_reads_at_most_declared_points() -> Result<(), Box<dyn std::error::Error>> {
		let text = "VERSION 0.7\nFIELDS x y z\nPOINTS 1\nDATA ascii\n1 2 3\n4 5 6\n";
		let record = from_pcd(text.as_bytes(), GRAY)?;

		assert_eq!(record.len(), 1);
		Ok(())
	}

	#[test]
	fn test_declared_points_far_beyond_body() -> Result<(), Box<dyn std::error::Error>> {
		let text = "VERSION 0.7\nFIELDS x y z\nPOINTS 4000000000000000000\nDATA ascii\n1 2 3\n";
		let record = from_pcd(text.as_bytes(), GRAY)?;

		assert_eq!(record.len(), 1);
		assert_eq!(record.positions(), &[1.0, 2.0, 3.0]);
		assert_eq!(record.origin(), Origin::Pcd { tier: Tier::Text });
		Ok(())
	}

	#[test]
	fn test_header_scan() -> Result<(), Box<dyn std::error::Error>> {
		let buffer = fs::read("resources/ascii_rgb.pcd")?;
		let header = PcdHeader::scan(&buffer)?;

		assert_eq!(header.fields, vec!["x", "y", "z", "r", "g", "b"]);
		assert_eq!(header.points, Some(3));
		assert_eq!(header.data, Some(DataEncoding::Ascii));
		assert!(buffer[header.data_offset..].starts_with(b"0.5 0.5 0.5"));
		assert!(header.has_color());
		assert!(header.color_columns());
		Ok(())
	}

	#[test]
	fn test_points_from_width_and_height() -> Result<(), Box<dyn std::error::Error>> {
		let header = PcdHeader::scan(b"VERSION .7\nWIDTH 4\nHEIGHT 2\nDATA binary\n")?;
		assert_eq!(header.points, Some(8));
		assert_eq!(header.data, Some(DataEncoding::Binary));
		Ok(())
	}

	#[test]
	fn test_width_times_height_overflows() {
		let result = PcdHeader::scan(b"VERSION .7\nWIDTH 18446744073709551615\nHEIGHT 2\nDATA binary\n");
		assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
	}

	#[test]
	fn test_unrecognized_header() {
		let result = from_pcd(b"0,0,0\n1,1,1\n", GRAY);
		assert!(matches!(result, Err(ParseError::InvalidFormat(_))));
	}

	#[test]
	fn test_empty_point_cloud_is_an_error() {
		let text = "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 1\nWIDTH 0\nHEIGHT 1\nVIEWPOINT 0 0 0 1 0 0 0\nPOINTS 0\nDATA ascii\n";
		let result = from_pcd(text.as_bytes(), GRAY);
		assert!(matches!(
			result,
			Err(ParseError::EmptyPointCloud) | Err(ParseError::Decode(_))
		));
	}

	#[test]
	fn test_truncated_binary_is_a_decode_error() {
		let mut buffer = binary_pcd("x y z", "F F F", &[([1.0, 2.0, 3.0], None); 4]);
		buffer.truncate(buffer.len() - 10);
		let result = from_pcd(&buffer, GRAY);
		assert!(matches!(result, Err(ParseError::Decode(_))));
	}
}
