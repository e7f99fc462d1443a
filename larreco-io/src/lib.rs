//! larreco-io: File-backed hit sources and result sinks for larreco.
//!
//! Hit tables are read either from memory-mapped fixed-width row files
//! (via memmap2) or, with the `hdf5` feature, from the `data` table of an
//! HDF5 file. Reconstructed events are written as CSV or JSON lines.
//!

mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod points;
mod reader;
pub mod scanner;
mod writer;

pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use hdf5::{write_hits_hdf5, Hdf5HitSource};
pub use points::{load_points_json, parse_points_json};
pub use reader::{encode_rows, MappedFileReader, MappedRowSource};
pub use scanner::{scan_source, SourceSummary};
pub use writer::{DataFileWriter, OutputFormat, ResultSink};
