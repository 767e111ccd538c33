//! Buffered record access on top of the tokenizer
//!
//! [`Reader`] keeps every record it has read, so rows can be revisited by
//! index, looked up through the header record, or converted a whole column
//! at a time on the rayon pool.

use crate::error::{Error, Result};
use crate::io::{ByteStream, FileSource};
use crate::options::ReaderOptions;
use crate::parser::Tokenizer;
use crate::record::Record;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub struct Reader<S = FileSource> {
    tokenizer: Tokenizer<S>,
    records: Vec<Record>,
    headers: Option<HashMap<String, usize>>,
    exhausted: bool,
}

impl Reader<FileSource> {
    /// Open a CSV file
    pub fn open<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self> {
        let source = FileSource::open(path.as_ref(), &options)?;
        debug!(
            path = %path.as_ref().display(),
            prefetch = source.is_prefetching(),
            "opened reader"
        );
        Self::from_stream(source, options)
    }
}

impl<S: ByteStream> Reader<S> {
    /// Wrap an existing stream. Reads the header record immediately when
    /// `options.has_headers` is set.
    pub fn from_stream(stream: S, options: ReaderOptions) -> Result<Self> {
        let mut reader = Self {
            tokenizer: Tokenizer::new(stream, options.dialect),
            records: Vec::new(),
            headers: None,
            exhausted: false,
        };

        if options.has_headers && reader.read_next()? {
            let index = reader.records[0]
                .fields()
                .enumerate()
                .map(|(i, name)| (name.to_string(), i))
                .collect();
            reader.headers = Some(index);
        }

        Ok(reader)
    }

    /// Read one more record into the history. Returns `false` at end of input.
    fn read_next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        let record = self.tokenizer.next_record()?;
        if record.is_end_of_input() {
            self.exhausted = true;
            debug!(records = self.records.len(), "reached end of input");
            return Ok(false);
        }

        self.records.push(record);
        Ok(true)
    }

    /// Read the next record, or `None` at end of input
    pub fn next_record(&mut self) -> Result<Option<&Record>> {
        if self.read_next()? {
            Ok(self.records.last())
        } else {
            Ok(None)
        }
    }

    /// Record at `index`, reading ahead as far as needed. The header record,
    /// when present, is index 0.
    pub fn get(&mut self, index: usize) -> Result<Option<&Record>> {
        while index >= self.records.len() && self.read_next()? {}
        Ok(self.records.get(index))
    }

    /// Read every remaining record
    pub fn read_to_end(&mut self) -> Result<&[Record]> {
        while self.read_next()? {}
        Ok(&self.records)
    }

    /// Records read so far, header included
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records read so far, header included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_headers(&self) -> bool {
        self.headers.is_some()
    }

    /// The header record, when the reader was opened with headers
    pub fn headers(&self) -> Option<&Record> {
        self.headers.as_ref().and_then(|_| self.records.first())
    }

    /// Column index of a header name
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.headers
            .as_ref()
            .and_then(|headers| headers.get(name).copied())
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    pub fn stream(&self) -> &S {
        self.tokenizer.stream()
    }

    /// Convert one column of every data record to `T`.
    ///
    /// Reads the rest of the input first, then converts records in parallel.
    /// Values come back in record order; the header record is skipped.
    pub fn column<T>(&mut self, index: usize) -> Result<Vec<T>>
    where
        T: FromStr + Send,
        T::Err: Display,
    {
        self.read_to_end()?;
        let skip = usize::from(self.has_headers());

        self.records[skip.min(self.records.len())..]
            .par_iter()
            .map(|record| record.typed_field::<T>(index, false, false))
            .collect()
    }

    /// [`column`](Self::column) looked up by header name
    pub fn column_by_name<T>(&mut self, name: &str) -> Result<Vec<T>>
    where
        T: FromStr + Send,
        T::Err: Display,
    {
        let index = self.index_of(name)?;
        self.column(index)
    }
}

/// Yields owned copies of the records as they are read
impl<S: ByteStream> Iterator for Reader<S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record.clone())),
            Ok(None) => None,
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::io::tests::{csv_file, CARS};

    const SALES: &[u8] = b"year,make,model,price\n\
2014,Ford,Fiesta,\"9,500\"\n\
2020,Maruti Suzuki,Brezza,8200\n\
2017,Honda,Jazz,7100\n";

    fn prefetching() -> ReaderOptions {
        ReaderOptions {
            prefetch_threshold: 0,
            buffer_capacity: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_next_row() {
        let file = csv_file(CARS);
        let mut reader = Reader::open(file.path(), ReaderOptions::default()).unwrap();

        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.typed_field::<i32>(0, false, false).unwrap(), 2014);
        assert_eq!(first.field(1).unwrap(), "Ford");
        assert_eq!(first.field(2).unwrap(), "Fiesta Classic");
        assert_eq!(first.field(3).unwrap(), "1.6");
    }

    #[test]
    fn test_iterate_raw_sizes() {
        let file = csv_file(CARS);
        let reader = Reader::open(file.path(), prefetching()).unwrap();

        let sizes: Vec<usize> = reader.map(|r| r.unwrap().raw_len()).collect();
        assert_eq!(sizes, vec![28, 29]);
    }

    #[test]
    fn test_random_access() {
        let file = csv_file(SALES);
        let mut reader = Reader::open(file.path(), ReaderOptions::default()).unwrap();

        assert_eq!(reader.len(), 0);
        assert_eq!(reader.get(2).unwrap().unwrap().field(1).unwrap(), "Maruti Suzuki");
        assert_eq!(reader.len(), 3);
        // Earlier rows stay available
        assert_eq!(reader.get(1).unwrap().unwrap().field(0).unwrap(), "2014");
        assert!(reader.get(10).unwrap().is_none());
        assert_eq!(reader.len(), 4);
    }

    #[test]
    fn test_headers() {
        let file = csv_file(SALES);
        let options = ReaderOptions {
            has_headers: true,
            ..prefetching()
        };
        let mut reader = Reader::open(file.path(), options).unwrap();

        assert!(reader.has_headers());
        assert_eq!(reader.headers().unwrap().field(3).unwrap(), "price");
        assert_eq!(reader.index_of("make").unwrap(), 1);
        assert!(matches!(
            reader.index_of("colour"),
            Err(Error::UnknownColumn(name)) if name == "colour"
        ));

        let years: Vec<u16> = reader.column_by_name("year").unwrap();
        assert_eq!(years, vec![2014, 2020, 2017]);
    }

    #[test]
    fn test_column_keeps_record_order() {
        let contents: Vec<u8> = (0..5_000)
            .flat_map(|i| format!("{},row{}\n", i, i).into_bytes())
            .collect();
        let file = csv_file(&contents);
        let mut reader = Reader::open(file.path(), prefetching()).unwrap();

        let values: Vec<u32> = reader.column(0).unwrap();
        assert_eq!(values, (0..5_000).collect::<Vec<u32>>());
    }

    #[test]
    fn test_column_conversion_error() {
        let file = csv_file(SALES);
        let mut reader = Reader::open(file.path(), ReaderOptions::default()).unwrap();

        // Without headers the first row is data, and "year" is not a number
        assert!(matches!(
            reader.column::<u32>(0),
            Err(Error::Conversion { .. })
        ));
        let names: Vec<String> = reader.column(1).unwrap();
        assert_eq!(names, vec!["make", "Ford", "Maruti Suzuki", "Honda"]);
    }

    #[test]
    fn test_column_out_of_range() {
        let file = csv_file(CARS);
        let mut reader = Reader::open(file.path(), ReaderOptions::default()).unwrap();

        assert!(matches!(
            reader.column::<String>(9),
            Err(Error::Index { index: 9, .. })
        ));
    }

    #[test]
    fn test_empty_file() {
        let file = csv_file(b"");
        let options = ReaderOptions {
            has_headers: true,
            ..Default::default()
        };
        let mut reader = Reader::open(file.path(), options).unwrap();

        assert!(reader.is_empty());
        assert!(!reader.has_headers());
        assert!(reader.next_record().unwrap().is_none());
        assert!(reader.column::<String>(0).unwrap().is_empty());
    }

    #[test]
    fn test_custom_dialect() {
        let file = csv_file(b"a;b\n\"x;y\";z\n");
        let options = ReaderOptions {
            dialect: Dialect::default().with_field_separator(b';'),
            ..Default::default()
        };
        let mut reader = Reader::open(file.path(), options).unwrap();

        let quoted: Vec<String> = reader.column(0).unwrap();
        assert_eq!(quoted, vec!["a", "\"x;y\""]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Reader::open(dir.path().join("meow.csv"), ReaderOptions::default()),
            Err(Error::Open { .. })
        ));
    }
}
