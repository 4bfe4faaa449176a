use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::colormap::Palette;
use crate::error::ConfigError;
use crate::reader::records::Delimiter;

pub const FALLBACK_GRAY: [f32; 3] = [0.7, 0.7, 0.7];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadOptions {
	pub palette: Palette,
	/// Color given to every point of a PCD file without color fields.
	pub fallback_color: [f32; 3],
	/// `None` sniffs the delimiter from the first line.
	pub delimiter: Option<char>,
}

impl Default for LoadOptions {
	fn default() -> LoadOptions {
		LoadOptions {
			palette: Palette::Default,
			fallback_color: FALLBACK_GRAY,
			delimiter: None,
		}
	}
}

impl LoadOptions {
	pub fn from_json_file(path: impl AsRef<Path>) -> Result<LoadOptions, ConfigError> {
		let contents = fs::read_to_string(path)?;
		let options: LoadOptions = serde_json::from_str(&contents)?;
		options.validate()?;
		Ok(options)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		self.delimiter()?;
		Ok(())
	}

	pub fn delimiter(&self) -> Result<Option<Delimiter>, ConfigError> {
		match self.delimiter {
			None => Ok(None),
			Some(c) if c == ' ' => Ok(Some(Delimiter::Whitespace)),
			Some(c) if c.is_ascii() => Ok(Some(Delimiter::Byte(c as u8))),
			Some(c) => Err(ConfigError::Delimiter(c.to_string())),
		}
	}
}
