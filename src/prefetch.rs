//! Double-buffered file reader with a background fill thread
//!
//! Two [`Chunk`]s circulate between the consumer and a producer thread. The
//! consumer reads one while the producer refills the other; a chunk is only
//! ever owned by one side, so it is never filled and read at the same time.
//!
//! ```text
//!             filled (A, B, A, ...)
//!  producer ─────────────────────────▶ consumer
//!     ▲                                   │
//!     └───────────────────────────────────┘
//!             recycled (spent chunk)
//! ```
//!
//! Both chunks are filled synchronously before the thread starts. From then
//! on the file cursor belongs to the producer.

use crate::error::{Error, Result};
use crate::io::{open_file, ByteStream, StreamState};
use crate::memory::{Chunk, FillStatus};
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Reads a file through two alternating buffers filled on a background thread
pub struct PrefetchReader {
    active: Chunk,
    /// The second initial chunk, read before anything comes from the producer
    standby: Option<Chunk>,
    cursor: usize,
    read_count: u64,
    file_size: u64,
    state: StreamState,
    filled: Receiver<Chunk>,
    recycle: Option<SyncSender<Chunk>>,
    stop: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl PrefetchReader {
    /// Open `path` with two buffers of `capacity` bytes each.
    ///
    /// Fails with [`Error::Open`] if the file cannot be opened. Both buffers
    /// are filled before this returns.
    pub fn open<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
        let path = path.as_ref();
        let (mut file, file_size) = open_file(path)?;
        let mut file_cursor = 0u64;

        let mut first = Chunk::with_capacity(capacity);
        let mut second = Chunk::with_capacity(capacity);
        if !first.fill(&mut file, &mut file_cursor, file_size).is_terminal() {
            second.fill(&mut file, &mut file_cursor, file_size);
        }

        // Capacity two: at most two chunks exist, so the producer never blocks on send
        let (filled_tx, filled) = mpsc::sync_channel(2);
        let (recycle, recycle_rx) = mpsc::sync_channel(2);

        let stop = Arc::new(AtomicBool::new(false));
        let producer = Producer {
            file,
            file_cursor,
            file_size,
            filled: filled_tx,
            recycled: recycle_rx,
            stop: Arc::clone(&stop),
        };

        let handle = thread::Builder::new()
            .name("turbocsv-prefetch".into())
            .spawn(move || producer.run())
            .map_err(Error::Spawn)?;

        debug!(
            path = %path.display(),
            file_size,
            capacity = first.capacity(),
            "started prefetch reader"
        );

        Ok(Self {
            active: first,
            standby: Some(second),
            cursor: 0,
            read_count: 0,
            file_size,
            state: StreamState::Open,
            filled,
            recycle: Some(recycle),
            stop,
            producer: Some(handle),
        })
    }

    /// Capacity of each of the two buffers
    pub fn capacity(&self) -> usize {
        self.active.capacity()
    }

    /// Hand the spent chunk back to the producer and wait for the other one
    fn switch_buffer(&mut self) -> std::result::Result<(), io::Error> {
        let spent = std::mem::replace(&mut self.active, Chunk::detached());
        if let Some(recycle) = &self.recycle {
            // The producer is gone once it has delivered a terminal chunk
            let _ = recycle.send(spent);
        }

        self.active = match self.standby.take() {
            Some(chunk) => chunk,
            None => self.filled.recv().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "prefetch thread exited before delivering data",
                )
            })?,
        };
        self.cursor = 0;
        Ok(())
    }

    fn fail(&mut self, err: io::Error) -> Result<Option<u8>> {
        warn!(offset = self.read_count, error = %err, "prefetch read failed");
        self.state = StreamState::Failed(err.kind());
        self.shutdown();
        Err(Error::Read {
            offset: self.read_count,
            source: err,
        })
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        // Closing the recycle channel wakes a producer waiting for a chunk
        self.recycle = None;
        if let Some(handle) = self.producer.take() {
            if handle.join().is_err() {
                warn!("prefetch thread panicked");
            }
        }
    }
}

impl ByteStream for PrefetchReader {
    #[inline]
    fn next_byte(&mut self) -> Result<Option<u8>> {
        loop {
            if let Some(&byte) = self.active.data().get(self.cursor) {
                self.cursor += 1;
                self.read_count += 1;
                return Ok(Some(byte));
            }

            if !matches!(self.state, StreamState::Open) {
                return self.state.replay(self.read_count);
            }

            match self.active.status() {
                FillStatus::Filled => {
                    if let Err(err) = self.switch_buffer() {
                        return self.fail(err);
                    }
                }
                FillStatus::FinalPartial | FillStatus::EndOfFile => {
                    self.state = StreamState::Finished;
                    self.shutdown();
                    return Ok(None);
                }
                FillStatus::Failed(_) => {
                    let err = self
                        .active
                        .take_error()
                        .unwrap_or_else(|| io::Error::from(io::ErrorKind::Other));
                    return self.fail(err);
                }
            }
        }
    }

    fn bytes_read(&self) -> u64 {
        self.read_count
    }

    fn is_open(&self) -> bool {
        matches!(self.state, StreamState::Open)
    }

    fn file_size(&self) -> u64 {
        self.file_size
    }
}

impl Drop for PrefetchReader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The background half: owns the file and refills whatever the consumer returns
struct Producer {
    file: File,
    file_cursor: u64,
    file_size: u64,
    filled: SyncSender<Chunk>,
    recycled: Receiver<Chunk>,
    stop: Arc<AtomicBool>,
}

impl Producer {
    fn run(mut self) {
        debug!("prefetch thread running");

        while !self.stop.load(Ordering::Acquire) {
            let mut chunk = match self.recycled.recv() {
                Ok(chunk) => chunk,
                Err(_) => break,
            };

            let status = chunk.fill(&mut self.file, &mut self.file_cursor, self.file_size);
            let terminal = status.is_terminal();
            trace!(
                len = chunk.len(),
                file_cursor = self.file_cursor,
                terminal,
                "refilled buffer"
            );

            if self.filled.send(chunk).is_err() || terminal {
                break;
            }
        }

        debug!(file_cursor = self.file_cursor, "prefetch thread stopped");
    }
}
