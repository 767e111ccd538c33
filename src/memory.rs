//! Fixed-capacity prefetch buffers and the result of filling one

use std::io::{self, Read};

/// Outcome of the last fill, carried next to the bytes instead of inside them
#[derive(Debug)]
pub enum FillStatus {
    /// The buffer is full and more data follows in the other buffer
    Filled,
    /// The buffer holds the last bytes of the file
    FinalPartial,
    /// Nothing was left to read
    EndOfFile,
    /// The read failed; the buffer holds no data
    Failed(io::Error),
}

impl FillStatus {
    /// No fill will follow this one
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FillStatus::Filled)
    }
}

/// A buffer of fixed capacity together with how much of it is valid
#[derive(Debug)]
pub struct Chunk {
    data: Box<[u8]>,
    len: usize,
    status: FillStatus,
}

impl Chunk {
    /// Allocate an empty buffer holding up to `capacity` bytes (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.max(1)].into_boxed_slice(),
            len: 0,
            status: FillStatus::EndOfFile,
        }
    }

    /// A zero-capacity placeholder, used while the real buffer is in flight
    pub(crate) fn detached() -> Self {
        Self {
            data: Box::default(),
            len: 0,
            status: FillStatus::EndOfFile,
        }
    }

    /// Valid bytes from the last fill
    #[inline(always)]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn status(&self) -> &FillStatus {
        &self.status
    }

    /// Take the failure out of a `Failed` chunk, leaving it at `EndOfFile`
    pub(crate) fn take_error(&mut self) -> Option<io::Error> {
        match std::mem::replace(&mut self.status, FillStatus::EndOfFile) {
            FillStatus::Failed(err) => Some(err),
            other => {
                self.status = other;
                None
            }
        }
    }

    /// Refill from `source`, whose remaining length is `file_size - *cursor`.
    ///
    /// If what remains fits, it is read in full and the chunk becomes
    /// `FinalPartial`; otherwise exactly `capacity` bytes are read and the
    /// chunk becomes `Filled`. `cursor` only advances on success.
    pub fn fill<R: Read>(&mut self, source: &mut R, cursor: &mut u64, file_size: u64) -> &FillStatus {
        let remaining = file_size.saturating_sub(*cursor);
        self.len = 0;

        if remaining == 0 {
            self.status = FillStatus::EndOfFile;
            return &self.status;
        }

        let capacity = self.capacity();
        let (want, status) = if remaining <= capacity as u64 {
            (remaining as usize, FillStatus::FinalPartial)
        } else {
            (capacity, FillStatus::Filled)
        };

        self.status = match source.read_exact(&mut self.data[..want]) {
            Ok(()) => {
                self.len = want;
                *cursor += want as u64;
                status
            }
            Err(err) => FillStatus::Failed(err),
        };
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn test_fill_sequence() {
        let data = b"2014,Ford,Fiesta";
        let mut source = Cursor::new(&data[..]);
        let mut cursor = 0;
        let mut chunk = Chunk::with_capacity(10);

        assert!(matches!(
            chunk.fill(&mut source, &mut cursor, data.len() as u64),
            FillStatus::Filled
        ));
        assert_eq!(chunk.data(), b"2014,Ford,");
        assert_eq!(cursor, 10);

        assert!(matches!(
            chunk.fill(&mut source, &mut cursor, data.len() as u64),
            FillStatus::FinalPartial
        ));
        assert_eq!(chunk.data(), b"Fiesta");
        assert_eq!(cursor, 16);

        assert!(matches!(
            chunk.fill(&mut source, &mut cursor, data.len() as u64),
            FillStatus::EndOfFile
        ));
        assert!(chunk.is_empty());
        assert!(chunk.status().is_terminal());
    }

    #[test]
    fn test_exact_fit_is_final() {
        let data = b"abcd";
        let mut cursor = 0;
        let mut chunk = Chunk::with_capacity(4);

        let status = chunk.fill(&mut Cursor::new(&data[..]), &mut cursor, 4);
        assert!(matches!(status, FillStatus::FinalPartial));
        assert_eq!(chunk.data(), b"abcd");
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let chunk = Chunk::with_capacity(0);
        assert_eq!(chunk.capacity(), 1);
        assert_eq!(Chunk::detached().capacity(), 0);
    }

    #[test]
    fn test_failed_fill_keeps_cursor() {
        let mut cursor = 3;
        let mut chunk = Chunk::with_capacity(8);

        let status = chunk.fill(&mut Broken, &mut cursor, 100);
        assert!(matches!(status, FillStatus::Failed(_)));
        assert!(chunk.is_empty());
        assert_eq!(cursor, 3);

        let err = chunk.take_error().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(chunk.take_error().is_none());
    }

    #[test]
    fn test_short_source_fails() {
        // The file shrank after its size was taken
        let mut cursor = 0;
        let mut chunk = Chunk::with_capacity(8);

        let status = chunk.fill(&mut Cursor::new(&b"ab"[..]), &mut cursor, 6);
        match status {
            FillStatus::Failed(err) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected status {:?}", other),
        }
    }
}
