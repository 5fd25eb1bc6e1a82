//! Peekable reader for sniff-then-stream workflows.
//!
//! Thin convenience wrapper around standard library I/O primitives
//! ([`Read::take`], [`Cursor`], [`Chain`]) so a media source only has to be
//! opened once: buffer enough of the head to detect its type, then stream
//! everything (head included) into the archive.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{Chain, Cursor, Read};

/// A resumable [`Read`]er for peek-decide-stream workflows.
///
/// Read enough of the content to inspect (magic bytes), then stream the full
/// content onward via [`into_reader`](Self::into_reader), or drop to discard.
pub struct PeekableReader<R> {
    inner: R,
    buffer: Vec<u8>,
}

impl<R: Read> PeekableReader<R> {
    /// Wrap any reader for peeking.
    pub fn new(inner: R) -> Self {
        Self { inner, buffer: Vec::new() }
    }

    /// Read up to `limit` bytes of the content.
    ///
    /// Returns a slice of the buffered head, which is shorter than `limit`
    /// when the source ends early. Successive calls do not accumulate:
    /// - `peek(256)` puts 256 bytes in the buffer, returns 256 bytes
    /// - `peek(384)` puts an additional 128 bytes in the buffer, returns 384 bytes
    /// - `peek(8)` immediately returns 8 bytes (because buffer already has 384)
    pub fn peek(&mut self, limit: usize) -> Result<&[u8]> {
        if self.buffer.len() >= limit {
            return Ok(&self.buffer[..limit]);
        }
        let needed = (limit - self.buffer.len()) as u64;
        (&mut self.inner).take(needed).read_to_end(&mut self.buffer).or_raise(|| ErrorKind::Unreadable)?;
        Ok(&self.buffer[..self.buffer.len().min(limit)])
    }

    /// Convert into a [`Read`]er that replays the buffered head, then
    /// streams the remaining content.
    pub fn into_reader(self) -> Chain<Cursor<Vec<u8>>, R> {
        Cursor::new(self.buffer).chain(self.inner)
    }
}
