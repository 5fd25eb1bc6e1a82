//! Seeding helpers for tests.
//!
//! The feed reader owns writes to the cache; this workspace only ever reads
//! it. These helpers exist so that tests (here and in dependent crates, via
//! the `fixtures` feature) can build a realistic cache in memory.

use crate::Database;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;

/// Builder for a media row.
#[derive(Debug, Clone)]
pub struct NewMedia {
    url: String,
    mime_type: String,
    content: Option<Vec<u8>>,
    size: Option<u64>,
    cached: bool,
    created_at: UtcDateTime,
}

impl NewMedia {
    /// Media stored inline in the database.
    pub fn inline(url: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self { content: Some(content.into()), ..Self::blob(url) }
    }

    /// Media stored in the blob store under the hash of its URL.
    pub fn blob(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime_type: String::new(),
            content: None,
            size: None,
            cached: true,
            created_at: UtcDateTime::now(),
        }
    }

    pub fn mime(self, mime_type: impl Into<String>) -> Self {
        Self { mime_type: mime_type.into(), ..self }
    }

    /// Recorded size; defaults to the inline content length (or zero).
    pub fn size(self, size: u64) -> Self {
        Self { size: Some(size), ..self }
    }

    pub fn created_at(self, created_at: UtcDateTime) -> Self {
        Self { created_at, ..self }
    }

    /// Known to the cache, but never (successfully) downloaded.
    pub fn uncached(self) -> Self {
        Self { cached: false, ..self }
    }
}

/// Inserts feeds, entries and media.
#[derive(Debug, Clone)]
pub struct Seeder {
    pool: SqlitePool,
}
impl From<&Database> for Seeder {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Seeder {
    pub async fn feed(&self, title: &str) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(include_str!("../queries/insert_feed.sql"))
            .bind(title)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(id)
    }

    /// Create an entry in an existing feed.
    pub async fn entry_in(&self, feed_id: i64) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(include_str!("../queries/insert_entry.sql"))
            .bind(feed_id)
            .bind("")
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(id)
    }

    /// Create a new feed titled `feed_title` with a single entry, returning
    /// the entry id.
    pub async fn entry(&self, feed_title: &str) -> Result<i64> {
        let feed_id = self.feed(feed_title).await?;
        self.entry_in(feed_id).await
    }

    pub async fn media(&self, media: NewMedia) -> Result<i64> {
        let size = media.size.unwrap_or_else(|| media.content.as_ref().map_or(0, |c| c.len() as u64));
        let size = i64::try_from(size).or_raise(|| ErrorKind::InvalidData("media size"))?;
        let (id,): (i64,) = sqlx::query_as(include_str!("../queries/insert_media.sql"))
            .bind(&media.url)
            .bind(mediapack_storage::hash_url(&media.url))
            .bind(&media.mime_type)
            .bind(&media.content)
            .bind(size)
            .bind(media.cached)
            .bind(media.created_at.unix_timestamp())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(id)
    }

    pub async fn link(&self, entry_id: i64, media_id: i64) -> Result<()> {
        sqlx::query(include_str!("../queries/link_entry_media.sql"))
            .bind(entry_id)
            .bind(media_id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}
