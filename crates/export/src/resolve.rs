//! Locating the bytes of a media item.

use crate::error::{ErrorKind, Result};
use mediapack_cache::MediaRecord;
use mediapack_storage::{BlobStore, OpenBlob};
use std::io::{Cursor, Read};

/// Readable content of a single media item, from exactly one storage tier.
pub enum MediaSource<'a> {
    /// Content stored inline in the metadata database.
    Inline(Cursor<&'a [u8]>),
    /// Content streamed from the blob store.
    Blob(OpenBlob),
}

impl MediaSource<'_> {
    /// Length of the content in bytes, as known when it was opened.
    pub fn size(&self) -> u64 {
        match self {
            Self::Inline(cursor) => cursor.get_ref().len() as u64,
            Self::Blob(blob) => blob.size,
        }
    }
}

impl Read for MediaSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Inline(cursor) => cursor.read(buf),
            Self::Blob(blob) => blob.reader.read(buf),
        }
    }
}

impl std::fmt::Debug for MediaSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline(cursor) => f.debug_tuple("Inline").field(&cursor.get_ref().len()).finish(),
            Self::Blob(blob) => f.debug_tuple("Blob").field(&blob.size).finish(),
        }
    }
}

/// Open the content of `record`.
///
/// Non-empty inline content always wins; an empty inline blob is treated as
/// absent. Anything the blob store can't produce is reported as
/// [`SourceMissing`](ErrorKind::SourceMissing).
pub async fn open<'a>(record: &'a MediaRecord, blobs: &dyn BlobStore) -> Result<MediaSource<'a>> {
    if record.is_inline() {
        let content = record.content.as_deref().unwrap_or_default();
        return Ok(MediaSource::Inline(Cursor::new(content)));
    }
    match blobs.open(&record.url_hash).await {
        Ok(blob) => Ok(MediaSource::Blob(blob)),
        Err(err) => {
            tracing::debug!(store = blobs.name(), hash = %record.url_hash, "blob unavailable");
            Err(ErrorKind::source_missing(err))
        },
    }
}
