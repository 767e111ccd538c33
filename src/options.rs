//! Construction-time configuration

use crate::dialect::Dialect;

/// Default capacity of each prefetch buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 1 << 20;

/// Files smaller than this are read without a prefetch thread
pub const DEFAULT_PREFETCH_THRESHOLD: u64 = 64 * 1024;

/// Options controlling how a CSV file is opened and tokenized.
///
/// # Default
///
/// The default [`Dialect`], 1 MiB buffers, a 64 KiB prefetch threshold and
/// no header record.
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Grammar used by the tokenizer and the record splitter.
    pub dialect: Dialect,

    /// Number of data bytes each of the two prefetch buffers holds.
    ///
    /// Values below 1 are treated as 1.
    pub buffer_capacity: usize,

    /// Files whose size is below this many bytes are read synchronously,
    /// where starting a background thread costs more than it saves.
    ///
    /// `0` always prefetches; `u64::MAX` never does.
    pub prefetch_threshold: u64,

    /// Treat the first record as a header naming the columns.
    pub has_headers: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            has_headers: false,
        }
    }
}

impl ReaderOptions {
    /// Whether a file of `file_size` bytes should be read by the prefetch thread
    pub fn prefetches(&self, file_size: u64) -> bool {
        file_size >= self.prefetch_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefetch_threshold() {
        let options = ReaderOptions::default();
        assert!(!options.prefetches(58));
        assert!(options.prefetches(DEFAULT_PREFETCH_THRESHOLD));

        let always = ReaderOptions {
            prefetch_threshold: 0,
            ..Default::default()
        };
        assert!(always.prefetches(0));

        let never = ReaderOptions {
            prefetch_threshold: u64::MAX,
            ..Default::default()
        };
        assert!(!never.prefetches(u64::MAX - 1));
    }
}
