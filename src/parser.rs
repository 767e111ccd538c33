//! Record tokenizer
//!
//! Splits a byte stream into records. A record separator ends a record only
//! when an even number of escape characters has been seen in that record so
//! far; inside an odd run it is ordinary content. Runs are not checked for
//! balance, only their parity at each separator.

use crate::dialect::Dialect;
use crate::error::Result;
use crate::io::ByteStream;
use crate::record::{RawRecord, Record};

/// Reads records one at a time from a [`ByteStream`]
pub struct Tokenizer<S> {
    stream: S,
    dialect: Dialect,
    fused: bool,
}

impl<S: ByteStream> Tokenizer<S> {
    pub fn new(stream: S, dialect: Dialect) -> Self {
        Self {
            stream,
            dialect,
            fused: false,
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Read the next raw record.
    ///
    /// Returns [`RawRecord::end_of_input`] once the stream is exhausted. Bytes
    /// left over without a closing separator form one last record.
    pub fn next_raw(&mut self) -> Result<RawRecord> {
        let dialect = self.dialect;
        let mut text = Vec::new();
        let mut escapes = Vec::new();

        loop {
            let byte = match self.stream.next_byte()? {
                Some(byte) => byte,
                None if text.is_empty() => return Ok(RawRecord::end_of_input()),
                None => return Ok(RawRecord::new(text, escapes)),
            };

            if dialect.is_escape_character(byte) {
                escapes.push(text.len());
                text.push(byte);
            } else if dialect.is_record_separator(byte) {
                if escapes.len() % 2 == 0 {
                    return Ok(RawRecord::new(text, escapes));
                }
                text.push(byte);
            } else if dialect.is_ignore_character(byte) {
                // Only kept inside an escaped run
                if escapes.len() % 2 == 1 {
                    text.push(byte);
                }
            } else {
                text.push(byte);
            }
        }
    }

    /// Read the next record, splitting it with this tokenizer's dialect
    pub fn next_record(&mut self) -> Result<Record> {
        self.next_raw().map(|raw| Record::new(raw, self.dialect))
    }
}

/// Yields records until the end of input. Stops after the first error.
impl<S: ByteStream> Iterator for Tokenizer<S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        match self.next_record() {
            Ok(record) if record.is_end_of_input() => {
                self.fused = true;
                None
            }
            Ok(record) => Some(Ok(record)),
            Err(err) => {
                self.fused = true;
                Some(Err(err))
            }
        }
    }
}
