//! Command-line Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A command-line error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for the command-line entry point.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Fix the config file, environment or arguments.
    #[display("invalid configuration")]
    Config,
    /// Pick another output path (or fix its permissions).
    #[display("cannot create output archive: {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
    /// The cache database is missing or can't be opened.
    #[display("cannot open cache database: {}", _0.display())]
    Cache(#[error(not(source))] PathBuf),
    /// The media directory is unusable.
    #[display("cannot open media directory: {}", _0.display())]
    Storage(#[error(not(source))] PathBuf),
    /// The export itself failed part-way; the output archive is incomplete.
    #[display("export failed")]
    Export,
}
