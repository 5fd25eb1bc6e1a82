//! Export Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use mediapack_storage::error::Error as StorageError;

/// An export error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an export failure.
///
/// ### Fatal
/// - [`ErrorKind::EmptyCache`]
/// - [`ErrorKind::Cache`]
/// - [`ErrorKind::Archive`]
///
/// ### Per-item
/// - [`ErrorKind::SourceMissing`]: the item is skipped and the export carries
///   on; never yielded by the [`export`](crate::export()) stream.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// There is nothing to export.
    #[display("no cached media found")]
    EmptyCache,
    /// Querying the metadata store failed.
    #[display("cache query failed")]
    Cache,
    /// The media content could not be opened or read.
    #[display("{_0}")]
    SourceMissing(#[error(not(source))] String),
    /// Creating or writing an archive entry (or finalizing the archive)
    /// failed.
    #[display("archive write failed")]
    Archive,
}

impl ErrorKind {
    /// Convert a blob store error into a per-item [`SourceMissing`](Self::SourceMissing)
    /// error, keeping the store's error tree as a child.
    #[track_caller]
    pub fn source_missing(err: StorageError) -> Error {
        let reason = (*err).to_string();
        err.raise(ErrorKind::SourceMissing(reason))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cache)
    }

    /// Returns `true` if the export can carry on past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SourceMissing(_))
    }
}
