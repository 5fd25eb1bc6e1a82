//! On-disk arrangement of blobs under the store root.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// How blob files are arranged beneath the store root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `<root>/<hash>`
    Flat,
    /// `<root>/<first two characters of hash>/<hash>`, keeping directories small.
    #[default]
    Sharded,
}

impl Display for Layout {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Layout::Flat => write!(f, "flat"),
            Layout::Sharded => write!(f, "sharded"),
        }
    }
}

impl Layout {
    /// Path of a blob relative to the store root. The hash must already be
    /// validated.
    #[must_use]
    pub fn relative_path(&self, hash: &str) -> PathBuf {
        match self {
            Layout::Flat => PathBuf::from(hash),
            // Hashes shorter than a shard prefix go in the root.
            Layout::Sharded if hash.len() <= 2 => PathBuf::from(hash),
            Layout::Sharded => PathBuf::from(&hash[..2]).join(hash),
        }
    }
}
