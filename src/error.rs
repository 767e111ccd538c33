//! Error types for turbocsv

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for turbocsv operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The file could not be opened or its size could not be read.
    /// Raised at construction; no stream exists afterwards.
    #[error("could not open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not start prefetch thread: {0}")]
    Spawn(#[source] io::Error),

    /// Reading stopped early. `offset` is the number of bytes delivered
    /// before the failure; the stream stays in this state.
    #[error("read failed after {offset} bytes: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("field index {index} out of range for record with {count} fields")]
    Index { index: usize, count: usize },

    #[error("cannot convert field {index} ({text:?}) to {target}: {reason}")]
    Conversion {
        index: usize,
        text: String,
        target: &'static str,
        reason: String,
    },

    #[error("no column named '{0}'")]
    UnknownColumn(String),
}

impl Error {
    /// Whether the error leaves the stream unusable
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::Open { .. } | Error::Spawn(_) | Error::Read { .. }
        )
    }
}
