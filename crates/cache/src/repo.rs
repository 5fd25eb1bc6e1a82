//! Read access to cached media, page by page.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{ExportStat, FeedGroup, MediaRecord, MediaRow, StatRow};
use exn::ResultExt;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::instrument;

/// Group `(label, media)` pairs by label, keeping labels in order of first
/// appearance and media in their original order.
fn group_by_label(rows: Vec<(String, MediaRecord)>) -> Vec<FeedGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<FeedGroup> = Vec::new();
    for (label, media) in rows {
        match index.get(&label) {
            Some(&position) => groups[position].medias.push(media),
            None => {
                index.insert(label.clone(), groups.len());
                groups.push(FeedGroup { label, medias: vec![media] });
            },
        }
    }
    groups
}

/// Repository over the cached media of the feed reader.
///
/// Only media flagged as cached are visible. Each media is attributed to a
/// single feed (that of the oldest entry referencing it), so a media shared
/// between feeds is still visited exactly once.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Count, total recorded size and highest id of all cached media.
    #[instrument(skip(self))]
    pub async fn stat(&self) -> Result<ExportStat> {
        let row: StatRow = sqlx::query_as(include_str!("../queries/cached_medias_stat.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let stat = ExportStat::try_from(row)?;
        tracing::debug!(count = stat.count, total_size = stat.total_size, max_id = stat.max_id, "cache stat");
        Ok(stat)
    }

    /// Up to `limit` cached media in ascending id order, skipping the first
    /// `offset`, grouped by feed label.
    ///
    /// Groups appear in order of their first media; a label may therefore
    /// show up again on a later page.
    #[instrument(skip(self))]
    pub async fn page(&self, offset: u64, limit: u64) -> Result<Vec<FeedGroup>> {
        let limit = i64::try_from(limit).or_raise(|| ErrorKind::InvalidData("page limit"))?;
        let offset = i64::try_from(offset).or_raise(|| ErrorKind::InvalidData("page offset"))?;
        let rows: Vec<MediaRow> = sqlx::query_as(include_str!("../queries/cached_medias_page.sql"))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let rows = rows.into_iter().map(<(String, MediaRecord)>::try_from).collect::<Result<Vec<_>>>()?;
        Ok(group_by_label(rows))
    }
}
