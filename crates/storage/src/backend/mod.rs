//! Blob store trait and implementations.
//!
//! This module defines the [`BlobStore`] trait, a read-side interface over
//! content-addressed media files, with a local filesystem implementation and
//! an in-memory one for tests.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBlobStore;
#[cfg(feature = "mock")]
pub use self::mock::MockBlobStore;
use crate::error::Result;
use async_trait::async_trait;
use std::io::Read;

/// A blob opened for reading.
pub struct OpenBlob {
    /// Positioned at the start of the blob. `'static`, so it can be moved
    /// into blocking code.
    pub reader: Box<dyn Read + Send + 'static>,
    /// Length in bytes at the time the blob was opened.
    pub size: u64,
}

impl std::fmt::Debug for OpenBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenBlob").field("size", &self.size).finish_non_exhaustive()
    }
}

/// Unified interface for blob stores.
///
/// Blobs are addressed by hash (see [`hash_url`](crate::hash_url)) and are
/// read-only from the point of view of this workspace. All hashes must pass
/// [`validate_hash`](crate::validate_hash); implementations enforce this and
/// return [`InvalidHash`](crate::error::ErrorKind::InvalidHash) otherwise.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// Open a blob for streaming reads.
    ///
    /// The async setup (opening the file, reading its length) happens before
    /// returning. Returns [`NotFound`](crate::error::ErrorKind::NotFound) if
    /// the blob does not exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use mediapack_storage::{BlobStore, error::Result};
    /// # async fn example(store: &dyn BlobStore) -> Result<()> {
    /// let mut blob = store.open("6f1b17063da85085").await?;
    /// let mut head = [0u8; 8];
    /// if blob.size >= 8 {
    ///     std::io::Read::read_exact(&mut blob.reader, &mut head).ok();
    /// }
    /// # Ok(())
    /// # }
    /// ```
    async fn open(&self, hash: &str) -> Result<OpenBlob>;
}
