use std::path::Path;

use log::{info, warn};

use crate::error::LoadError;
use crate::model::bounds::{merge_into, HeightBounds};
use crate::model::options::LoadOptions;
use crate::model::record::PointCloudRecord;
use crate::reader::{file_name, parse_file};

/// A successfully parsed file, keyed by its file name.
#[derive(Debug, Clone)]
pub struct LoadedCloud {
	pub id: String,
	pub record: PointCloudRecord,
}

/// Result of loading several files: the clouds in input order, their merged
/// height range and the files that failed.
#[derive(Debug, Default)]
pub struct Batch {
	pub clouds: Vec<LoadedCloud>,
	pub bounds: Option<HeightBounds>,
	pub failures: Vec<LoadError>,
}

impl Batch {
	pub fn records(&self) -> impl Iterator<Item = &PointCloudRecord> {
		self.clouds.iter().map(|cloud| &cloud.record)
	}

	pub fn num_points(&self) -> usize {
		self.records().map(PointCloudRecord::len).sum()
	}

	/// Clouds cut down to `min <= z <= max`. Clouds with nothing left are dropped.
	pub fn filter_by_height(&self, min: f64, max: f64) -> Vec<LoadedCloud> {
		self.clouds
			.iter()
			.filter_map(|cloud| {
				cloud.record.filter_by_height(min, max).map(|record| LoadedCloud {
					id: cloud.id.clone(),
					record,
				})
			})
			.collect()
	}
}

/// Parses `paths` one after another. A failing file is logged and recorded
/// in [`Batch::failures`]; the rest of the batch still loads.
pub fn load_batch<P: AsRef<Path>>(paths: &[P], options: &LoadOptions) -> Batch {
	let mut batch = Batch::default();

	for path in paths {
		let path = path.as_ref();
		match parse_file(path, options, |bounds| {
			batch.bounds = Some(merge_into(batch.bounds, bounds))
		}) {
			Ok(record) => batch.clouds.push(LoadedCloud {
				id: file_name(path),
				record,
			}),
			Err(err) => {
				warn!("skipping {}", err);
				batch.failures.push(err);
			}
		}
	}

	info!(
		"loaded {} of {} files, {} points",
		batch.clouds.len(),
		paths.len(),
		batch.num_points()
	);
	batch
}
