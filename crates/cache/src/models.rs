//! Read-only snapshots of cached media, and the rows they are decoded from.

use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::UtcDateTime;

/// A single cached media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRecord {
    /// Positive and unique; assigned in insertion order.
    pub id: i64,
    /// Original source URL (may be empty).
    pub url: String,
    /// Declared MIME type (may be empty).
    pub content_type: String,
    /// Inline blob. Only present for media stored in the database itself.
    pub content: Option<Vec<u8>>,
    /// Hash of `url`; the blob store key when `content` is absent or empty.
    pub url_hash: String,
    /// Recorded size in bytes.
    pub size: u64,
    pub created_at: UtcDateTime,
}

impl MediaRecord {
    /// Whether the media is stored inline (non-empty `content`).
    pub fn is_inline(&self) -> bool {
        self.content.as_ref().is_some_and(|content| !content.is_empty())
    }
}

/// Media sharing a feed label, in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedGroup {
    /// Title of the owning feed, or empty for media not linked to any entry.
    pub label: String,
    pub medias: Vec<MediaRecord>,
}

/// Aggregate figures over every cached media item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStat {
    pub count: u64,
    pub total_size: u64,
    pub max_id: u64,
}

#[derive(sqlx::FromRow)]
pub(crate) struct StatRow {
    count: i64,
    total_size: i64,
    max_id: i64,
}
impl TryFrom<StatRow> for ExportStat {
    type Error = Error;
    fn try_from(row: StatRow) -> Result<Self, Self::Error> {
        Ok(Self {
            count: u64::try_from(row.count).or_raise(|| ErrorKind::InvalidData("media count"))?,
            total_size: u64::try_from(row.total_size).or_raise(|| ErrorKind::InvalidData("total size"))?,
            max_id: u64::try_from(row.max_id).or_raise(|| ErrorKind::InvalidData("media id"))?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct MediaRow {
    id: i64,
    url: String,
    url_hash: String,
    mime_type: String,
    content: Option<Vec<u8>>,
    size: i64,
    created_at: i64,
    feed_title: String,
}
/// Splits a row into its feed label and the media itself.
impl TryFrom<MediaRow> for (String, MediaRecord) {
    type Error = Error;
    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        let media = MediaRecord {
            id: row.id,
            url: row.url,
            content_type: row.mime_type,
            content: row.content,
            url_hash: row.url_hash,
            size: u64::try_from(row.size).or_raise(|| ErrorKind::InvalidData("media size"))?,
            created_at: UtcDateTime::from_unix_timestamp(row.created_at)
                .or_raise(|| ErrorKind::InvalidData("creation date"))?,
        };
        Ok((row.feed_title, media))
    }
}
