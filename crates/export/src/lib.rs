//! Packs cached feed media into a single zip archive.
//!
//! Every cached media item becomes one archive entry at
//! `<feed>/<id>-<date>[-<slug>][.<ext>]`:
//!
//! - the content comes from the inline blob in the cache database, or from
//!   the blob store ([`resolve`]),
//! - the extension is sniffed from the declared type, the URL or the first
//!   bytes of the content ([`mediapack_sniff`]),
//! - the name is built deterministically from the record ([`build_name`]).
//!
//! [`export()`] drives the whole thing as a stream of progress events.

pub mod error;
mod export;
mod name;
pub mod resolve;
mod sink;

pub use crate::export::{
    DEFAULT_PAGE_SIZE, ExportEvent, ExportOptions, ItemOutcome, Progress, Summary, export, process_item,
};
pub use crate::name::{UNSORTED_FOLDER, build_name, folder_name, pad_width};
pub use crate::sink::{ArchiveSink, Compression, ParseCompressionError, SinkGuard, ZipSink};
pub use mediapack_cache::ExportStat;
