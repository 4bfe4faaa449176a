use csv::{ReaderBuilder, Trim};

/// A single field of a delimited row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
	Number(f64),
	Text(String),
}

impl Cell {
	pub fn parse(raw: &str) -> Cell {
		let raw = raw.trim();
		match raw.parse::<f64>() {
			Ok(value) => Cell::Number(value),
			Err(_) => Cell::Text(raw.to_string()),
		}
	}

	/// Numeric value, NaN for text.
	pub fn as_f64(&self) -> f64 {
		match self {
			Cell::Number(value) => *value,
			Cell::Text(_) => f64::NAN,
		}
	}
}

pub type Row = Vec<Cell>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
	Byte(u8),
	/// Any run of spaces or tabs.
	Whitespace,
}

/// Picks the delimiter from the first non-blank line.
pub fn sniff_delimiter(text: &str) -> Delimiter {
	let line = text.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
	for candidate in [b',', b';', b'\t'] {
		if line.as_bytes().contains(&candidate) {
			return Delimiter::Byte(candidate);
		}
	}
	Delimiter::Whitespace
}

/// Splits `text` into rows of typed cells. Blank lines are dropped, no header is assumed.
pub fn decode_records(text: &str, delimiter: Delimiter) -> Result<Vec<Row>, csv::Error> {
	let text = text.trim_start_matches('\u{feff}');

	let delimiter = match delimiter {
		Delimiter::Byte(delimiter) => delimiter,
		Delimiter::Whitespace => {
			return Ok(text
				.lines()
				.filter(|line| !line.trim().is_empty())
				.map(|line| line.split_whitespace().map(Cell::parse).collect())
				.collect())
		}
	};

	let mut rdr = ReaderBuilder::new()
		.has_headers(false)
		.flexible(true)
		.trim(Trim::All)
		.delimiter(delimiter)
		.from_reader(text.as_bytes());

	let mut rows = Vec::new();
	for result in rdr.records() {
		let record = result?;
		if record.iter().all(|field| field.is_empty()) {
			continue;
		}
		rows.push(record.iter().map(Cell::parse).collect());
	}

	Ok(rows)
}
