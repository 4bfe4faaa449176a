//! Point-cloud ingestion: delimited text and PCD files parsed into flat,
//! validated position/color buffers, colored by elevation when the source
//! carries no color, and exported back to delimited text.

pub mod batch;
pub mod colormap;
pub mod error;
pub mod model;
pub mod reader;
pub mod writer;

pub use batch::{load_batch, Batch, LoadedCloud};
pub use colormap::{colormap, Palette};
pub use error::{ExportError, LoadError, ParseError};
pub use model::bounds::HeightBounds;
pub use model::options::LoadOptions;
pub use model::record::PointCloudRecord;
pub use reader::{parse_bytes, parse_file, SourceFormat};
pub use writer::export_records;
