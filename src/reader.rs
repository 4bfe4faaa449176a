pub mod csv_reader;
pub mod pcd_reader;
pub mod records;

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{LoadError, ParseError};
use crate::model::bounds::HeightBounds;
use crate::model::options::LoadOptions;
use crate::model::record::PointCloudRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
	/// `x,y,z[,r,g,b]` rows.
	Delimited,
	Pcd,
}

impl SourceFormat {
	pub fn from_extension(extension: &str) -> Result<SourceFormat, ParseError> {
		match extension.to_ascii_lowercase().as_str() {
			"csv" | "txt" | "xyz" | "pts" => Ok(SourceFormat::Delimited),
			"pcd" => Ok(SourceFormat::Pcd),
			other => Err(ParseError::UnsupportedExtension(other.to_string())),
		}
	}

	pub fn from_path(path: &Path) -> Result<SourceFormat, ParseError> {
		let extension = path.extension().and_then(OsStr::to_str).unwrap_or("");
		SourceFormat::from_extension(extension)
	}
}

/// Parses in-memory file content of a known format.
pub fn parse_bytes(
	format: SourceFormat,
	buf: &[u8],
	options: &LoadOptions,
) -> Result<PointCloudRecord, ParseError> {
	match format {
		SourceFormat::Delimited => {
			csv_reader::from_csv(buf, options.palette, options.delimiter()?)
		}
		SourceFormat::Pcd => pcd_reader::from_pcd(buf, options.fallback_color),
	}
}

/// Reads and parses one file, then reports its height range to `on_bounds`.
pub fn parse_file(
	path: &Path,
	options: &LoadOptions,
	on_bounds: impl FnOnce(HeightBounds),
) -> Result<PointCloudRecord, LoadError> {
	let name = file_name(path);
	let wrap = |err: ParseError| LoadError::new(name.clone(), err);

	let format = SourceFormat::from_path(path).map_err(wrap)?;
	let buf = fs::read(path).map_err(|err| wrap(err.into()))?;
	let record = parse_bytes(format, &buf, options).map_err(wrap)?;

	debug!(
		"{}: {} points, z in [{}, {}]",
		name,
		record.len(),
		record.height_bounds().min,
		record.height_bounds().max
	);
	on_bounds(record.height_bounds());

	Ok(record)
}

pub fn file_name(path: &Path) -> String {
	path.file_name()
		.unwrap_or(path.as_os_str())
		.to_string_lossy()
		.into_owned()
}
