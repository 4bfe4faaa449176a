use thiserror::Error;

/// Fatal failure while turning one file into a point cloud.
#[derive(Debug, Error)]
pub enum ParseError {
	#[error("no valid points ({skipped} rows skipped)")]
	NoValidPoints { skipped: usize },

	#[error("empty point cloud")]
	EmptyPointCloud,

	#[error("invalid format: {0}")]
	InvalidFormat(String),

	#[error("failed to decode point cloud: {0}")]
	Decode(String),

	#[error("unsupported file extension: {0:?}")]
	UnsupportedExtension(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Csv(#[from] csv::Error),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// A [`ParseError`] tagged with the file it came from.
#[derive(Debug, Error)]
#[error("{file}: {source}")]
pub struct LoadError {
	pub file: String,
	#[source]
	pub source: ParseError,
}

impl LoadError {
	pub fn new(file: impl Into<String>, source: ParseError) -> LoadError {
		LoadError {
			file: file.into(),
			source,
		}
	}
}

#[derive(Debug, Error)]
pub enum ExportError {
	#[error(transparent)]
	Csv(#[from] csv::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("exported text is not valid UTF-8")]
	Utf8(#[from] std::string::FromUtf8Error),

	#[error("{0} points do not fit a u32 point count")]
	TooManyPoints(usize),
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("invalid config: {0}")]
	Json(#[from] serde_json::Error),

	#[error("delimiter must be a single ASCII character, got {0:?}")]
	Delimiter(String),
}
