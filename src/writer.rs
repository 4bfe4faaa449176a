use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use csv::WriterBuilder;

use crate::error::ExportError;
use crate::model::record::PointCloudRecord;

pub const EXPORT_HEADER: [&str; 6] = ["X", "Y", "Z", "R", "G", "B"];

/// Delimited text of every point in `records`, in order, under an `X,Y,Z,R,G,B` header.
/// Colors are written as 0-255 integers.
pub fn export_records<'a>(
	records: impl IntoIterator<Item = &'a PointCloudRecord>,
) -> Result<String, ExportError> {
	let mut wtr = WriterBuilder::new()
		.has_headers(false)
		.from_writer(Vec::new());

	wtr.write_record(EXPORT_HEADER)?;
	for record in records {
		for row in record.source_rows() {
			wtr.serialize(row)?;
		}
	}

	let bytes = wtr.into_inner().map_err(|err| err.into_error())?;
	Ok(String::from_utf8(bytes)?)
}

pub fn write_records<'a>(
	path: &Path,
	records: impl IntoIterator<Item = &'a PointCloudRecord>,
) -> Result<(), ExportError> {
	let text = export_records(records)?;
	let mut file = File::create(path)?;
	file.write_all(text.as_bytes())?;
	Ok(())
}

/// Raw render buffers: point count as `u32`, then positions, then colors, all little endian.
pub fn write_buffers<W: Write>(out: &mut W, record: &PointCloudRecord) -> Result<(), ExportError> {
	out.write_u32::<LittleEndian>(point_count(record.len())?)?;
	for &value in record.positions() {
		out.write_f32::<LittleEndian>(value)?;
	}
	for &value in record.colors() {
		out.write_f32::<LittleEndian>(value)?;
	}
	Ok(())
}

fn point_count(len: usize) -> Result<u32, ExportError> {
	u32::try_from(len).map_err(|_| ExportError::TooManyPoints(len))
}

pub fn write_buffers_file<'a>(
	path: &Path,
	records: impl IntoIterator<Item = &'a PointCloudRecord>,
) -> Result<(), ExportError> {
	let mut out = BufWriter::new(File::create(path)?);
	for record in records {
		write_buffers(&mut out, record)?;
	}
	out.flush()?;
	Ok(())
}
