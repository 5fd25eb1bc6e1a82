//! Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Connecting to, or querying, the database failed.
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// The database file doesn't exist (and wasn't meant to be created).
    #[display("cache database not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// A stored value can't be represented by the model (negative sizes,
    /// out-of-range timestamps).
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Database.to_string(), "database error");
        assert_eq!(ErrorKind::InvalidData("media size").to_string(), "invalid cache data: media size");
        assert!(!ErrorKind::Migration.is_retryable());
    }
}
