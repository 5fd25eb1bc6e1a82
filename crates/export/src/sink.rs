//! Archive output.
//!
//! The exporter writes through the [`ArchiveSink`] trait, so tests can
//! observe exactly which entries were written and how often the archive was
//! finalized. [`ZipSink`] is the real thing.

use crate::error::{ErrorKind, Result};
use derive_more::{Display, Error};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};
use std::str::FromStr;
use time::UtcDateTime;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Per-entry compression method.
///
/// Cached media is overwhelmingly already compressed (JPEG, PNG, MP4...), so
/// entries are stored as-is by default.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    #[display("stored")]
    Stored,
    #[display("deflated")]
    Deflated,
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("unknown compression method {_0:?} (expected \"stored\" or \"deflated\")")]
pub struct ParseCompressionError(#[error(not(source))] String);

impl FromStr for Compression {
    type Err = ParseCompressionError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stored" | "store" | "none" => Ok(Self::Stored),
            "deflated" | "deflate" => Ok(Self::Deflated),
            _ => Err(ParseCompressionError(s.to_string())),
        }
    }
}

impl From<Compression> for CompressionMethod {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// Destination for exported entries.
///
/// Calls are synchronous and made inline by the exporter, one entry at a
/// time. `finish` completes the archive; implementations may reject any call
/// made after it.
pub trait ArchiveSink {
    /// Add an entry at `path` (forward-slash separated) and stream `reader`
    /// into it, returning the number of bytes written. `size` is the
    /// expected length of the content.
    fn append(&mut self, path: &str, modified: UtcDateTime, size: u64, reader: &mut dyn Read) -> Result<u64>;

    /// Remove the partial entry left behind by an `append` that failed while
    /// reading its content.
    fn discard(&mut self) -> Result<()>;

    /// Finalize the archive.
    fn finish(&mut self) -> Result<()>;
}

impl<S: ArchiveSink + ?Sized> ArchiveSink for &mut S {
    fn append(&mut self, path: &str, modified: UtcDateTime, size: u64, reader: &mut dyn Read) -> Result<u64> {
        (**self).append(path, modified, size, reader)
    }

    fn discard(&mut self) -> Result<()> {
        (**self).discard()
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Entries at least this large are written with zip64 headers. Deflate can
/// grow incompressible content slightly, hence the headroom below the 4 GiB
/// limit of plain zip.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64 - (1 << 20);

/// Zip archive writer.
pub struct ZipSink<W: Write + Seek> {
    writer: Option<ZipWriter<W>>,
    finished: Option<W>,
    compression: Compression,
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(inner: W, compression: Compression) -> Self {
        Self { writer: Some(ZipWriter::new(inner)), finished: None, compression }
    }

    /// The underlying writer, once the archive has been finished.
    pub fn into_inner(self) -> Option<W> {
        self.finished
    }

    /// Zip timestamps are local, second-precision (rounded down to even) and
    /// limited to 1980-2107; anything else falls back to the zip epoch.
    fn timestamp(modified: UtcDateTime) -> DateTime {
        let (date, time) = (modified.date(), modified.time());
        u16::try_from(date.year())
            .ok()
            .and_then(|year| {
                DateTime::from_date_and_time(
                    year,
                    u8::from(date.month()),
                    date.day(),
                    time.hour(),
                    time.minute(),
                    time.second(),
                )
                .ok()
            })
            .unwrap_or_default()
    }

    fn options(&self, modified: UtcDateTime, size: u64) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(self.compression.into())
            .last_modified_time(Self::timestamp(modified))
            .large_file(size >= ZIP64_THRESHOLD)
    }
}

impl<W: Write + Seek> ArchiveSink for ZipSink<W> {
    fn append(&mut self, path: &str, modified: UtcDateTime, size: u64, reader: &mut dyn Read) -> Result<u64> {
        let options = self.options(modified, size);
        let writer = self.writer.as_mut().ok_or_else(|| exn::Exn::from(ErrorKind::Archive))?;
        writer.start_file(path, options).or_raise(|| ErrorKind::Archive)?;
        std::io::copy(reader, writer).or_raise(|| ErrorKind::Archive)
    }

    fn discard(&mut self) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| exn::Exn::from(ErrorKind::Archive))?;
        writer.abort_file().or_raise(|| ErrorKind::Archive)
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            let mut inner = writer.finish().or_raise(|| ErrorKind::Archive)?;
            inner.flush().or_raise(|| ErrorKind::Archive)?;
            self.finished = Some(inner);
        }
        Ok(())
    }
}

/// Owns a sink and guarantees it is finalized exactly once: explicitly via
/// [`finish`](Self::finish), or on [`abort`](Self::abort) or drop otherwise.
pub struct SinkGuard<S: ArchiveSink> {
    sink: S,
    finished: bool,
}

impl<S: ArchiveSink> SinkGuard<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, finished: false }
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Finalize the sink. Subsequent calls are no-ops.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.sink.finish()
    }

    /// Finalize the sink on a failure path, where the original error matters
    /// more than this one.
    pub fn abort(&mut self) {
        if let Err(err) = self.finish() {
            tracing::warn!(error = ?err, "failed to finalize archive");
        }
    }
}

impl<S: ArchiveSink> Drop for SinkGuard<S> {
    fn drop(&mut self) {
        self.abort();
    }
}
