//! Byte sources for the tokenizer

use crate::error::{Error, Result};
use crate::options::ReaderOptions;
use crate::prefetch::PrefetchReader;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// A forward-only stream of file bytes.
///
/// Every implementation yields the file's bytes in order and keeps the same
/// running count, so the tokenizer cannot tell them apart.
pub trait ByteStream {
    /// The next byte, or `None` once the end of the file has been reached.
    ///
    /// After `None` every later call returns `None` again. A read failure is
    /// returned as [`Error::Read`] and repeats on later calls.
    fn next_byte(&mut self) -> Result<Option<u8>>;

    /// Number of bytes yielded so far
    fn bytes_read(&self) -> u64;

    /// Whether the stream can still yield bytes
    fn is_open(&self) -> bool;

    /// Size of the underlying file in bytes, taken when it was opened
    fn file_size(&self) -> u64;
}

impl<S: ByteStream + ?Sized> ByteStream for &mut S {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        (**self).next_byte()
    }

    fn bytes_read(&self) -> u64 {
        (**self).bytes_read()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn file_size(&self) -> u64 {
        (**self).file_size()
    }
}

/// Open `path` and read its size, mapping failures to [`Error::Open`]
pub(crate) fn open_file(path: &Path) -> Result<(File, u64)> {
    let open_error = |source: io::Error| Error::Open {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(open_error)?;
    let metadata = file.metadata().map_err(open_error)?;
    if metadata.is_dir() {
        return Err(open_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "is a directory",
        )));
    }

    Ok((file, metadata.len()))
}

/// Terminal state shared by both readers
#[derive(Debug)]
pub(crate) enum StreamState {
    Open,
    Finished,
    Failed(io::ErrorKind),
}

impl StreamState {
    /// Replay a terminal state on a later read
    pub(crate) fn replay(&self, offset: u64) -> Result<Option<u8>> {
        match self {
            StreamState::Failed(kind) => Err(Error::Read {
                offset,
                source: io::Error::from(*kind),
            }),
            _ => Ok(None),
        }
    }
}

/// Reads the file directly on the calling thread.
///
/// Cheaper than [`PrefetchReader`] for small files, where starting a thread
/// costs more than overlapping the reads saves.
pub struct SyncReader {
    source: Option<BufReader<File>>,
    file_size: u64,
    read_count: u64,
    state: StreamState,
}

impl SyncReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (file, file_size) = open_file(path.as_ref())?;
        debug!(path = %path.as_ref().display(), file_size, "opened synchronous reader");

        Ok(Self {
            source: Some(BufReader::new(file)),
            file_size,
            read_count: 0,
            state: StreamState::Open,
        })
    }
}

impl ByteStream for SyncReader {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let source = match self.source.as_mut() {
            Some(source) => source,
            None => return self.state.replay(self.read_count),
        };

        let byte = match source.fill_buf() {
            Ok(buf) => buf.first().copied(),
            Err(err) => {
                self.state = StreamState::Failed(err.kind());
                self.source = None;
                return Err(Error::Read {
                    offset: self.read_count,
                    source: err,
                });
            }
        };

        match byte {
            Some(byte) => {
                source.consume(1);
                self.read_count += 1;
                Ok(Some(byte))
            }
            None => {
                self.state = StreamState::Finished;
                self.source = None;
                Ok(None)
            }
        }
    }

    fn bytes_read(&self) -> u64 {
        self.read_count
    }

    fn is_open(&self) -> bool {
        self.source.is_some()
    }

    fn file_size(&self) -> u64 {
        self.file_size
    }
}

/// A file stream whose variant is picked from the file size
pub enum FileSource {
    Sync(SyncReader),
    Prefetch(PrefetchReader),
}

impl FileSource {
    /// Open `path`, prefetching on a background thread when the file is at
    /// least `options.prefetch_threshold` bytes long
    pub fn open<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        let (_, file_size) = open_file(path)?;

        if options.prefetches(file_size) {
            PrefetchReader::open(path, options.buffer_capacity).map(FileSource::Prefetch)
        } else {
            SyncReader::open(path).map(FileSource::Sync)
        }
    }

    pub fn is_prefetching(&self) -> bool {
        matches!(self, FileSource::Prefetch(_))
    }
}

impl ByteStream for FileSource {
    #[inline]
    fn next_byte(&mut self) -> Result<Option<u8>> {
        match self {
            FileSource::Sync(reader) => reader.next_byte(),
            FileSource::Prefetch(reader) => reader.next_byte(),
        }
    }

    fn bytes_read(&self) -> u64 {
        match self {
            FileSource::Sync(reader) => reader.bytes_read(),
            FileSource::Prefetch(reader) => reader.bytes_read(),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            FileSource::Sync(reader) => reader.is_open(),
            FileSource::Prefetch(reader) => reader.is_open(),
        }
    }

    fn file_size(&self) -> u64 {
        match self {
            FileSource::Sync(reader) => reader.file_size(),
            FileSource::Prefetch(reader) => reader.file_size(),
        }
    }
}

/// Drain a stream into a vector
pub fn read_all<S: ByteStream>(stream: &mut S) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(stream.file_size() as usize);
    while let Some(byte) = stream.next_byte()? {
        data.push(byte);
    }
    Ok(data)
}
