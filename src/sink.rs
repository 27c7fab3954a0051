//! CSV persistence of captured edges.
//!
//! Drains the [`EventQueue`] in fixed batches and appends one line per
//! record to a single growing log on the SD card:
//!
//! ```text
//! Signal,Edge,Timestamp
//! MU,R,60012
//! MU,F,60511
//! ```
//!
//! Lines end in CRLF, like the logs written by earlier firmware. A fresh
//! (missing or empty) file gets the header exactly once.
//!
//! Only the polling loop calls [`CsvSink::drain_and_persist`]; it is the
//! queue's single consumer.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::clock;
use crate::config::{CSV_HEADER, DRAIN_BATCH_SIZE};
use crate::queue::EventQueue;
use crate::record::EventRecord;

/// Why a persistence attempt failed.
#[derive(Debug)]
pub enum SinkError {
    /// No card / volume not mounted.
    CardMissing,
    /// Open, write or flush failed.
    Io(io::Error),
}

impl core::fmt::Display for SinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SinkError::CardMissing => f.write_str("SD card not available"),
            SinkError::Io(e) => write!(f, "SD write failed: {}", e),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::CardMissing => None,
            SinkError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        SinkError::Io(e)
    }
}

/// Result of one [`CsvSink::drain_and_persist`] call.
#[derive(Debug, Default)]
pub struct PersistReport {
    /// Records handed to the file and flushed.
    pub records_written: usize,
    /// Records taken from the queue but not confirmed written.
    pub records_lost: usize,
    /// `None` on success.
    pub error: Option<SinkError>,
}

impl PersistReport {
    #[inline]
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    #[inline]
    pub fn card_missing(&self) -> bool {
        matches!(self.error, Some(SinkError::CardMissing))
    }
}

/// Durable storage the sink appends to.
pub trait Storage {
    type Writer: Write;

    /// Whether the medium is usable right now.
    fn is_present(&mut self) -> bool;

    /// Length of `path`, `None` if it does not exist.
    fn file_len(&mut self, path: &str) -> Option<u64>;

    /// Open `path` for appending, creating it if needed.
    fn open_append(&mut self, path: &str) -> io::Result<Self::Writer>;

    /// Called after a failed open, write or flush.
    fn on_io_error(&mut self) {}
}

/// [`Storage`] on a mounted filesystem (the SD FAT volume on device).
///
/// Writes go straight to the file; the sink hands it one batch per write.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for FsStorage {
    type Writer = fs::File;

    fn is_present(&mut self) -> bool {
        fs::metadata(&self.root).map(|m| m.is_dir()).unwrap_or(false)
    }

    fn file_len(&mut self, path: &str) -> Option<u64> {
        fs::metadata(self.root.join(path)).ok().map(|m| m.len())
    }

    fn open_append(&mut self, path: &str) -> io::Result<Self::Writer> {
        OpenOptions::new().create(true).append(true).open(self.root.join(path))
    }
}

/// [`FsStorage`] behind a volume that can be (re)mounted at runtime.
///
/// `is_present` retries `mount` while unmounted, at most once per
/// `retry_interval_ms`. An I/O error drops the volume so a swapped card is
/// picked up on the next attempt. Dropping `V` must unmount it.
pub struct MountedStorage<V, F> {
    fs: FsStorage,
    mount: F,
    volume: Option<V>,
    retry_interval_ms: u32,
    last_attempt_ms: Option<u32>,
}

impl<V, E, F> MountedStorage<V, F>
where
    F: FnMut() -> Result<V, E>,
    E: core::fmt::Display,
{
    /// Nothing is mounted until the first `is_present` call.
    pub fn new(root: impl Into<PathBuf>, retry_interval_ms: u32, mount: F) -> Self {
        Self {
            fs: FsStorage::new(root),
            mount,
            volume: None,
            retry_interval_ms,
            last_attempt_ms: None,
        }
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.volume.is_some()
    }

    fn try_mount(&mut self) {
        let now = clock::millis();
        if let Some(last) = self.last_attempt_ms {
            if clock::elapsed(now, last) < self.retry_interval_ms {
                return;
            }
        }
        self.last_attempt_ms = Some(now);

        match (self.mount)() {
            Ok(volume) => {
                log::info!("Storage mounted at {}", self.fs.root().display());
                self.volume = Some(volume);
            }
            Err(e) => log::debug!("Storage mount failed: {}", e),
        }
    }
}

impl<V, E, F> Storage for MountedStorage<V, F>
where
    F: FnMut() -> Result<V, E>,
    E: core::fmt::Display,
{
    type Writer = fs::File;

    fn is_present(&mut self) -> bool {
        if self.volume.is_none() {
            self.try_mount();
        }
        self.volume.is_some() && self.fs.is_present()
    }

    fn file_len(&mut self, path: &str) -> Option<u64> {
        self.fs.file_len(path)
    }

    fn open_append(&mut self, path: &str) -> io::Result<Self::Writer> {
        self.fs.open_append(path)
    }

    fn on_io_error(&mut self) {
        if self.volume.take().is_some() {
            log::warn!("Storage unmounted after I/O error");
            self.last_attempt_ms = None;
        }
    }
}

/// Write one record as a CSV line.
#[inline]
pub fn write_record<W: Write>(out: &mut W, record: &EventRecord) -> io::Result<()> {
    write!(out, "{},{},{}\r\n", record.signal.code(), record.edge.code(), record.timestamp_ms)
}

/// Like `write_all`, but reports how many bytes the writer accepted
/// before an error.
fn write_counted<W: Write>(out: &mut W, mut buf: &[u8]) -> (usize, io::Result<()>) {
    let mut accepted = 0;
    while !buf.is_empty() {
        match out.write(buf) {
            Ok(0) => return (accepted, Err(io::ErrorKind::WriteZero.into())),
            Ok(n) => {
                accepted += n;
                buf = &buf[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (accepted, Err(e)),
        }
    }
    (accepted, Ok(()))
}

/// Appends queued records to a CSV log.
pub struct CsvSink<S: Storage> {
    storage: S,
    path: String,
    lines: Vec<u8>,
}

impl<S: Storage> CsvSink<S> {
    pub fn new(storage: S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
            lines: Vec::new(),
        }
    }

    /// Whether the storage medium is usable right now.
    pub fn is_card_present(&mut self) -> bool {
        self.storage.is_present()
    }

    /// Drain the queue into the log until it is empty or a write fails.
    ///
    /// An empty queue is a successful no-op (the header is still created
    /// on a fresh card).
    pub fn drain_and_persist<const N: usize>(&mut self, queue: &EventQueue<N>) -> PersistReport {
        let mut report = PersistReport::default();
        if let Err(e) = self.persist(queue, &mut report) {
            if matches!(e, SinkError::Io(_)) {
                self.storage.on_io_error();
            }
            report.error = Some(e);
        }
        report
    }

    fn persist<const N: usize>(&mut self, queue: &EventQueue<N>, report: &mut PersistReport) -> Result<(), SinkError> {
        if !self.storage.is_present() {
            return Err(SinkError::CardMissing);
        }

        let needs_header = self.storage.file_len(&self.path).unwrap_or(0) == 0;
        if !needs_header && queue.is_empty() {
            return Ok(());
        }

        let mut out = self.storage.open_append(&self.path)?;
        if needs_header {
            write!(out, "{}\r\n", CSV_HEADER)?;
            out.flush()?;
        }

        // A record counts as written once its whole line was accepted and
        // the flush that follows succeeded.
        let mut batch = [EventRecord::EMPTY; DRAIN_BATCH_SIZE];
        let mut line_ends = [0usize; DRAIN_BATCH_SIZE];
        loop {
            let n = queue.read(&mut batch);
            if n == 0 {
                break;
            }

            self.lines.clear();
            for (record, end) in batch[..n].iter().zip(line_ends.iter_mut()) {
                write_record(&mut self.lines, record)?;
                *end = self.lines.len();
            }

            let (accepted, written) = write_counted(&mut out, &self.lines);
            let flushed = out.flush();
            let complete = match flushed {
                Ok(()) => line_ends[..n].iter().take_while(|&&end| end <= accepted).count(),
                Err(_) => 0,
            };
            report.records_written += complete;

            if let Err(e) = written.and(flushed) {
                report.records_lost += n - complete;
                return Err(e.into());
            }
        }

        Ok(())
    }

    /// Access the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Edge, SignalId};

    #[test]
    fn test_write_record_format() {
        let mut out = Vec::new();
        write_record(&mut out, &EventRecord::new(SignalId::Mu, Edge::Falling, 4_294_967_295)).unwrap();
        assert_eq!(out, b"MU,F,4294967295\r\n");
    }

    #[test]
    fn test_sink_error_display() {
        assert_eq!(SinkError::CardMissing.to_string(), "SD card not available");
        let io = SinkError::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(io.to_string().contains("boom"));
    }
}
