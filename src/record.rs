//! Records and lazily split fields

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use bstr::{BStr, ByteSlice};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::OnceLock;

/// Undivided text of one row plus the offsets of its escape characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    text: Vec<u8>,
    escapes: Vec<usize>,
    end_of_input: bool,
}

impl RawRecord {
    /// Build a record from its text and the strictly increasing offsets of
    /// the escape characters within it
    pub fn new(text: Vec<u8>, escapes: Vec<usize>) -> Self {
        debug_assert!(escapes.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(escapes.last().map_or(true, |&last| last < text.len()));
        Self {
            text,
            escapes,
            end_of_input: false,
        }
    }

    /// Build a record from text, locating every `escape` byte in it
    pub fn with_escape(text: impl Into<Vec<u8>>, escape: u8) -> Self {
        let text = text.into();
        let escapes = text
            .iter()
            .enumerate()
            .filter(|&(_, &byte)| byte == escape)
            .map(|(pos, _)| pos)
            .collect();
        Self::new(text, escapes)
    }

    /// The record returned once the input is exhausted.
    ///
    /// Distinct from a blank row, which is a real record with one empty field.
    pub fn end_of_input() -> Self {
        Self {
            text: Vec::new(),
            escapes: Vec::new(),
            end_of_input: true,
        }
    }

    pub fn is_end_of_input(&self) -> bool {
        self.end_of_input
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn escape_offsets(&self) -> &[usize] {
        &self.escapes
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether `pos` lies inside an escaped run: an odd number of escape
    /// characters come before it
    #[inline]
    pub fn is_escaped(&self, pos: usize) -> bool {
        if self.escapes.is_empty() {
            return false;
        }
        self.escapes.partition_point(|&offset| offset < pos) % 2 == 1
    }
}

/// A field as a span of its record's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    start: usize,
    len: usize,
}

impl Field {
    #[inline(always)]
    fn range(self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// A record whose fields are split on first access
#[derive(Debug, Clone)]
pub struct Record {
    raw: RawRecord,
    dialect: Dialect,
    fields: OnceLock<Vec<Field>>,
}

impl Record {
    pub fn new(raw: RawRecord, dialect: Dialect) -> Self {
        Self {
            raw,
            dialect,
            fields: OnceLock::new(),
        }
    }

    /// Build a record from text using `dialect`'s escape character to find
    /// escaped runs
    pub fn parse(text: impl Into<Vec<u8>>, dialect: Dialect) -> Self {
        Self::new(RawRecord::with_escape(text, dialect.escape_character()), dialect)
    }

    pub fn raw(&self) -> &RawRecord {
        &self.raw
    }

    pub fn into_raw(self) -> RawRecord {
        self.raw
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn is_end_of_input(&self) -> bool {
        self.raw.is_end_of_input()
    }

    /// Length of the raw record text
    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.raw.text()
    }

    /// Number of fields; 0 for the end-of-input record
    pub fn field_count(&self) -> usize {
        self.split().len()
    }

    /// Text of field `index`, untrimmed
    pub fn field(&self, index: usize) -> Result<&BStr> {
        let fields = self.split();
        fields
            .get(index)
            .map(|field| self.raw.text()[field.range()].as_bstr())
            .ok_or(Error::Index {
                index,
                count: fields.len(),
            })
    }

    pub fn fields(&self) -> impl Iterator<Item = &BStr> + '_ {
        self.split()
            .iter()
            .map(move |field| self.raw.text()[field.range()].as_bstr())
    }

    /// Parse field `index` as `T`.
    ///
    /// Leading and trailing spaces are removed first when `trim_spaces` is
    /// set, then leading and trailing escape characters when `trim_escape` is
    /// set.
    pub fn typed_field<T>(&self, index: usize, trim_spaces: bool, trim_escape: bool) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let mut bytes: &[u8] = self.field(index)?;
        if trim_spaces {
            bytes = trim(bytes, b' ');
        }
        if trim_escape {
            bytes = trim(bytes, self.dialect.escape_character());
        }

        let conversion_error = |reason: String| Error::Conversion {
            index,
            text: bytes.to_str_lossy().into_owned(),
            target: std::any::type_name::<T>(),
            reason,
        };

        let text = std::str::from_utf8(bytes).map_err(|e| conversion_error(e.to_string()))?;
        text.parse::<T>().map_err(|e| conversion_error(e.to_string()))
    }

    fn split(&self) -> &[Field] {
        self.fields.get_or_init(|| {
            if self.raw.is_end_of_input() {
                return Vec::new();
            }
            split_fields(&self.raw, self.dialect.field_separator())
        })
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.dialect == other.dialect
    }
}

fn split_fields(raw: &RawRecord, separator: u8) -> Vec<Field> {
    let text = raw.text();
    let mut fields = Vec::new();
    let mut start = 0;

    for (pos, _) in text
        .iter()
        .enumerate()
        .filter(|&(_, &byte)| byte == separator)
    {
        if !raw.is_escaped(pos) {
            fields.push(Field {
                start,
                len: pos - start,
            });
            start = pos + 1;
        }
    }

    fields.push(Field {
        start,
        len: text.len() - start,
    });
    fields
}

/// Strip runs of `ch` from both ends of `field`.
///
/// Each end is scanned on its own, so `"a"` with quotes on one side only
/// still loses them.
pub fn trim(field: &[u8], ch: u8) -> &[u8] {
    let start = field
        .iter()
        .position(|&byte| byte != ch)
        .unwrap_or(field.len());
    let end = field
        .iter()
        .rposition(|&byte| byte != ch)
        .map_or(start, |pos| pos + 1);
    &field[start..end]
}
