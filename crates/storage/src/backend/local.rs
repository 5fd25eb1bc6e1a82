//! Local filesystem blob store.
//!
//! Blobs are plain files beneath a configured root directory, arranged
//! according to a [`Layout`]. Metadata lookups go through `tokio::fs`; the
//! returned reader is a standard [`File`](std::fs::File) so it can be read
//! from synchronous code.

use crate::backend::OpenBlob;
use crate::error::{ErrorKind, Result};
use crate::{BlobStore, Layout, validate_hash};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem blob store.
///
/// # Examples
///
/// ```no_run
/// use mediapack_storage::{Layout, backend::LocalBlobStore};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalBlobStore::new("media", "/var/cache/feeds/media", Layout::Sharded)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    name: String,
    /// Root directory for the blobs
    root: PathBuf,
    layout: Layout,
}
impl LocalBlobStore {
    /// Create a new local blob store.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRoot`](ErrorKind::InvalidRoot) if the path is not
    /// absolute or exists but is not a directory. A missing root is not an
    /// error: every lookup will simply report
    /// [`NotFound`](ErrorKind::NotFound).
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>, layout: Layout) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || (root.exists() && !root.is_dir()) {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        Ok(Self { name: name.into(), root, layout })
    }

    /// Get the absolute path for a blob hash.
    fn absolute_path(&self, hash: &str) -> Result<PathBuf> {
        let validated = validate_hash(hash)?;
        Ok(self.root.join(self.layout.relative_path(validated)))
    }

    fn map_io_error(e: std::io::Error, hash: &str, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(hash.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self, hash: &str) -> Result<OpenBlob> {
        let abs_path = self.absolute_path(hash)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| Self::map_io_error(e, hash, &abs_path))?;
        let metadata = file.metadata().await.map_err(|e| Self::map_io_error(e, hash, &abs_path))?;
        // A directory where a blob should be is as good as no blob.
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(hash.to_string()));
        }
        let size = metadata.len();
        tracing::trace!(store = %self.name, path = %abs_path.display(), size, "opened blob");
        Ok(OpenBlob { reader: Box::new(file.into_std().await), size })
    }
}
