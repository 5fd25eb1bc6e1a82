//! Content-addressed blob store for cached media.
//!
//! Media too large to be stored inline in the metadata database lives on disk
//! as one file per item, named after a hash of its source URL
//! ([`hash_url`]). The [`BlobStore`] trait is the only way the rest of the
//! workspace reaches those files: it resolves a hash to a readable stream or
//! reports [`NotFound`](error::ErrorKind::NotFound).

pub mod backend;
pub mod error;
mod hash;
mod layout;

pub use crate::backend::{BlobStore, OpenBlob};
pub use crate::hash::{hash_url, validate as validate_hash};
pub use crate::layout::Layout;
use std::sync::Arc;

pub type BlobHandle = Arc<dyn BlobStore + Send + Sync>;
