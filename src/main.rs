use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use cloudload::{load_batch, writer, LoadOptions, Palette, PointCloudRecord};

#[derive(Parser, Debug)]
#[command(
	name = "cloudload",
	about = "Load point cloud files, color them by elevation and export them as delimited text",
	version
)]
struct Cli {
	#[arg(required = true, num_args = 1.., value_name = "FILE")]
	input: Vec<PathBuf>,

	/// Colormap for files without color
	#[arg(short, long, value_enum)]
	palette: Option<Palette>,

	/// JSON file with load options
	#[arg(short, long, value_name = "JSON")]
	config: Option<PathBuf>,

	/// Field delimiter of delimited files, sniffed when omitted
	#[arg(short, long)]
	delimiter: Option<char>,

	#[arg(long, allow_hyphen_values = true)]
	min_z: Option<f64>,

	#[arg(long, allow_hyphen_values = true)]
	max_z: Option<f64>,

	/// Write the loaded points as X,Y,Z,R,G,B text
	#[arg(short, long, value_name = "CSV")]
	output: Option<PathBuf>,

	/// Write little endian position and color buffers
	#[arg(long, value_name = "BIN")]
	buffers: Option<PathBuf>,
}

fn main() -> ExitCode {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

	match run(Cli::parse()) {
		Ok(code) => code,
		Err(err) => {
			error!("{}", err);
			ExitCode::FAILURE
		}
	}
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
	let mut options = match &cli.config {
		Some(path) => LoadOptions::from_json_file(path)?,
		None => LoadOptions::default(),
	};
	if let Some(palette) = cli.palette {
		options.palette = palette;
	}
	if let Some(delimiter) = cli.delimiter {
		options.delimiter = Some(delimiter);
	}
	options.validate()?;

	let batch = load_batch(&cli.input, &options);
	for failure in &batch.failures {
		error!("{}", failure);
	}
	let bounds = match batch.bounds {
		Some(bounds) if !batch.clouds.is_empty() => bounds,
		_ => {
			error!("no file could be loaded");
			return Ok(ExitCode::FAILURE);
		}
	};
	info!("height bounds: [{}, {}]", bounds.min, bounds.max);

	let clouds = match (cli.min_z, cli.max_z) {
		(None, None) => batch.clouds,
		(min, max) => batch.filter_by_height(
			min.unwrap_or(f64::NEG_INFINITY),
			max.unwrap_or(f64::INFINITY),
		),
	};
	for cloud in &clouds {
		info!(
			"{}: {} points, explicit color: {}, skipped rows: {}",
			cloud.id,
			cloud.record.len(),
			cloud.record.has_explicit_color(),
			cloud.record.skipped_rows()
		);
	}

	let records: Vec<&PointCloudRecord> = clouds.iter().map(|cloud| &cloud.record).collect();
	if let Some(path) = &cli.output {
		writer::write_records(path, records.iter().copied())?;
		info!("wrote {}", path.display());
	}
	if let Some(path) = &cli.buffers {
		writer::write_buffers_file(path, records.iter().copied())?;
		info!("wrote {}", path.display());
	}

	Ok(ExitCode::SUCCESS)
}
