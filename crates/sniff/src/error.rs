//! Sniffing Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Only reading from the underlying source can fail;
//! registry lookups are infallible and return `Option`.

use derive_more::{Display, Error};

/// A sniffing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sniffing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source could not be read while buffering its head.
    #[display("unreadable source")]
    Unreadable,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed. A source that failed once
    /// is not read again.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
