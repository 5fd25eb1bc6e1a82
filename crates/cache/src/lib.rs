//! SQLite metadata store for cached feed media.
//!
//! The feed reader records every media item it has seen in a `medias` table,
//! together with the entries (and through them the feeds) that reference it.
//! Small items are stored inline in the row itself; everything else lives in
//! the blob store under the hash of its source URL.
//!
//! This crate only *reads* that state: [`Repository::stat`] for totals and
//! [`Repository::page`] for fixed-size pages of records grouped by feed.

mod db;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod models;
mod repo;

pub use crate::db::{Database, OpenMode};
pub use crate::models::{ExportStat, FeedGroup, MediaRecord};
pub use crate::repo::Repository;
