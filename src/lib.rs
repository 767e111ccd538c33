//! # turbocsv
//!
//! A CSV reader that keeps the disk busy while parsing.
//!
//! File bytes are prefetched on a background thread into two alternating
//! buffers ([`PrefetchReader`]); the [`Tokenizer`] turns the byte stream into
//! records, tracking escape characters so that separators inside an escaped
//! run stay part of the field; each [`Record`] splits its fields only when
//! first asked and keeps the split.
//!
//! ```no_run
//! use turbocsv::{Reader, ReaderOptions};
//!
//! # fn main() -> turbocsv::Result<()> {
//! let mut reader = Reader::open("cars.csv", ReaderOptions {
//!     has_headers: true,
//!     ..Default::default()
//! })?;
//! let years: Vec<u32> = reader.column_by_name("year")?;
//! # Ok(())
//! # }
//! ```

pub mod dialect;
pub mod error;
pub mod io;
pub mod memory;
pub mod options;
pub mod parser;
pub mod prefetch;
pub mod reader;
pub mod record;

pub use dialect::Dialect;
pub use error::{Error, Result};
pub use io::{ByteStream, FileSource, SyncReader};
pub use options::ReaderOptions;
pub use parser::Tokenizer;
pub use prefetch::PrefetchReader;
pub use reader::Reader;
pub use record::{trim, RawRecord, Record};

/// Open `path` as a byte stream, prefetching when the file is large enough
pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<FileSource> {
    FileSource::open(path, &ReaderOptions::default())
}
