//! In-memory blob store for testing.

use super::OpenBlob;
use crate::error::{ErrorKind, Result};
use crate::{BlobStore, validate_hash};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use tokio::sync::RwLock;

/// In-memory blob store for testing.
///
/// Blobs live in a `HashMap` behind a [`RwLock`], so the store can be shared
/// behind an `Arc` and seeded further with [`insert`](Self::insert) after it
/// has been handed to the code under test.
///
/// # Examples
///
/// ```
/// use mediapack_storage::{BlobStore, backend::MockBlobStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MockBlobStore::with_blobs([("abc123", b"GIF89a...")]);
/// assert_eq!(store.open("abc123").await?.size, 9);
/// assert!(store.open("def456").await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct MockBlobStore {
    name: String,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MockBlobStore {
    /// Create a mock store pre-populated with blobs.
    ///
    /// Panics if any hash fails validation; broken test setup should not
    /// produce a passing test.
    pub fn with_blobs(blobs: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (hash, data) in blobs {
            let hash = hash.into();
            if validate_hash(&hash).is_err() {
                panic!("MockBlobStore::with_blobs: invalid hash {hash:?}");
            }
            map.insert(hash, data.into());
        }
        Self {
            name: "mock".to_string(),
            blobs: RwLock::new(map),
        }
    }

    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::with_blobs(std::iter::empty::<(String, Vec<u8>)>())
    }

    /// Add or replace a blob.
    pub async fn insert(&self, hash: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<()> {
        let hash = hash.into();
        validate_hash(&hash)?;
        self.blobs.write().await.insert(hash, data.into());
        Ok(())
    }
}

impl Default for MockBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self, hash: &str) -> Result<OpenBlob> {
        let hash = validate_hash(hash)?;
        match self.blobs.read().await.get(hash) {
            Some(data) => Ok(OpenBlob {
                size: data.len() as u64,
                reader: Box::new(Cursor::new(data.clone())),
            }),
            None => exn::bail!(ErrorKind::NotFound(hash.to_string())),
        }
    }
}
