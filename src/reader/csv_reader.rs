use log::{debug, warn};

use crate::colormap::Palette;
use crate::error::ParseError;
use crate::model::record::{normalize_channel, ColorFill, Origin, PointCloudRecord, RecordBuilder};
use crate::reader::records::{decode_records, sniff_delimiter, Delimiter, Row};

/// Parses delimited `x,y,z[,r,g,b]` text. A first row with six or more fields
/// switches the whole file to explicit 0-255 color.
pub fn from_csv(
	buf: &[u8],
	palette: Palette,
	delimiter: Option<Delimiter>,
) -> Result<PointCloudRecord, ParseError> {
	let text = String::from_utf8_lossy(buf);
	let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&text));
	let rows = decode_records(&text, delimiter)?;

	from_rows(&rows, palette, delimiter)
}

pub fn from_rows(
	rows: &[Row],
	palette: Palette,
	delimiter: Delimiter,
) -> Result<PointCloudRecord, ParseError> {
	let has_color = rows.first().map_or(false, |row| row.len() >= 6);
	let mut builder = RecordBuilder::with_capacity(rows.len());

	for row in rows {
		if row.len() < 3 {
			builder.skip();
			continue;
		}
		let position = [row[0].as_f64(), row[1].as_f64(), row[2].as_f64()];

		if has_color {
			// a short row cannot keep colors index-aligned, drop it whole
			if row.len() < 6 {
				builder.skip();
				continue;
			}
			let color = [
				normalize_channel(row[3].as_f64()),
				normalize_channel(row[4].as_f64()),
				normalize_channel(row[5].as_f64()),
			];
			builder.push_colored(position, color);
		} else {
			builder.push_point(position);
		}
	}

	let skipped = builder.skipped();
	if skipped > 0 {
		warn!("skipped {} malformed rows", skipped);
	}
	debug!(
		"delimited: {} points, explicit color: {}",
		builder.len(),
		has_color
	);

	let fill = if has_color {
		ColorFill::Explicit
	} else {
		ColorFill::Colormap(palette)
	};

	builder
		.finish(fill, Origin::Delimited { delimiter })
		.ok_or(ParseError::NoValidPoints { skipped })
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;
	use crate::colormap::colormap;
	use crate::reader::records::Cell;

	#[test]
	fn test_read_csv_with_color() -> Result<(), Box<dyn std::error::Error>> {
		let record = from_csv(b"0,0,0,255,0,0\n1,1,1,0,255,0", Palette::Default, None)?;

		assert!(record.has_explicit_color());
		assert_eq!(record.positions(), &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
		assert_eq!(record.colors(), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
		assert_eq!(
			record.origin(),
			Origin::Delimited {
				delimiter: Delimiter::Byte(b',')
			}
		);
		Ok(())
	}

	#[test]
	fn test_read_csv_without_color_uses_colormap() -> Result<(), Box<dyn std::error::Error>> {
		let buffer = fs::read("resources/points_xyz.txt")?;
		let record = from_csv(&buffer, Palette::Rainbow, None)?;

		assert!(!record.has_explicit_color());
		assert_eq!(record.len(), 10);
		assert_eq!(record.colors().len(), 3 * record.len());

		let expected: Vec<f32> = colormap(record.z_values(), Palette::Rainbow)
			.into_iter()
			.flatten()
			.collect();
		assert_eq!(record.colors(), expected.as_slice());
		Ok(())
	}

	#[test]
	fn test_read_csv_fixture() -> Result<(), Box<dyn std::error::Error>> {
		let buffer = fs::read("resources/points_rgb.csv")?;
		let record = from_csv(&buffer, Palette::Default, None)?;

		assert!(record.has_explicit_color());
		assert_eq!(record.len(), 8);
		// header row and the row with a NaN coordinate
		assert_eq!(record.skipped_rows(), 2);
		Ok(())
	}

	#[test]
	fn test_non_finite_row_is_dropped() -> Result<(), Box<dyn std::error::Error>> {
		let rows = vec![
			vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(f64::NAN)],
			vec![Cell::Number(3.0), Cell::Number(4.0), Cell::Number(5.0)],
		];
		let record = from_rows(&rows, Palette::Default, Delimiter::Byte(b','))?;

		assert_eq!(record.positions(), &[3.0, 4.0, 5.0]);
		assert_eq!(record.z_values(), &[5.0]);
		assert_eq!(record.skipped_rows(), 1);
		Ok(())
	}

	#[test]
	fn test_short_row_in_colored_file_is_dropped() -> Result<(), Box<dyn std::error::Error>> {
		let record = from_csv(b"0,0,0,10,20,30\n1,1,1\n2,2,2,40,50,60\n", Palette::Default, None)?;

		assert_eq!(record.len(), 2);
		assert_eq!(record.positions(), &[0.0, 0.0, 0.0, 2.0, 2.0, 2.0]);
		assert_eq!(record.colors().len(), 6);
		assert_eq!(record.skipped_rows(), 1);
		Ok(())
	}

	#[test]
	fn test_bad_color_channels() -> Result<(), Box<dyn std::error::Error>> {
		let record = from_csv(b"0,0,0,abc,300,-5\n", Palette::Default, None)?;

		let gray = (128.0f64 / 255.0) as f32;
		assert_eq!(record.colors(), &[gray, 1.0, 0.0]);
		assert_eq!(record.source_rows()[0].r, 128);
		Ok(())
	}

	#[test]
	fn test_whitespace_and_semicolon_files() -> Result<(), Box<dyn std::error::Error>> {
		let spaced = from_csv(b"1 2 3\n4  5  6\n", Palette::Default, None)?;
		assert_eq!(spaced.positions(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

		let semi = from_csv(b"1;2;3\n", Palette::Default, Some(Delimiter::Byte(b';')))?;
		assert_eq!(semi.positions(), &[1.0, 2.0, 3.0]);
		Ok(())
	}

	#[test]
	fn test_no_valid_points() {
		let result = from_csv(b"x,y,z\na,b,c\n1,2\n", Palette::Default, None);
		assert!(matches!(
			result,
			Err(ParseError::NoValidPoints { skipped: 3 })
		));

		assert!(matches!(
			from_csv(b"", Palette::Default, None),
			Err(ParseError::NoValidPoints { skipped: 0 })
		));
	}
}
