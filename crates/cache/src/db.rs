//! Connection pool and schema management for the cache database.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
const MAX_CONNECTIONS: u32 = 3;
// The feed reader may hold the write lock while an export is reading.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// How to treat the database file at the given path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Open read-write, creating and migrating the file as needed.
    #[default]
    CreateIfMissing,
    /// Open an existing file read-only, as found. No migrations run and the
    /// journal mode is left alone. A missing file fails with
    /// [`NotFound`](ErrorKind::NotFound).
    ExistingOnly,
}

/// Handle to the cache database.
///
/// Cheap to clone; every clone shares the same pool. Hand it to a
/// [`Repository`](crate::Repository) to query it.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database at `path` according to `mode`.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), ?mode))]
    pub async fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        match mode {
            OpenMode::CreateIfMissing => {
                let options = Self::connect_options()
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .filename(path)
                    .create_if_missing(true);
                Self::migrated(options, MAX_CONNECTIONS).await
            },
            OpenMode::ExistingOnly => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                let options = Self::connect_options().filename(path).read_only(true);
                let pool = Self::pool_with(options, MAX_CONNECTIONS).await?;
                Ok(Self { pool })
            },
        }
    }

    /// Shorthand for [`open`](Self::open) with [`OpenMode::CreateIfMissing`].
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, OpenMode::CreateIfMissing).await
    }

    /// A fresh, private, migrated in-memory database.
    ///
    /// Available outside of `#[cfg(test)]` for the benefit of other crates'
    /// tests. The pool is capped at one connection: every `:memory:`
    /// connection is a separate database.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::migrated(Self::connect_options().filename(":memory:"), 1).await
    }

    /// Per-connection settings only; nothing here is persisted in the file.
    fn connect_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT)
            .pragma("cache_size", "-8192")
            .pragma("temp_store", "MEMORY")
    }

    async fn pool_with(options: SqliteConnectOptions, max_connections: u32) -> Result<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(max_connections, "cache database ready");
        Ok(pool)
    }

    async fn migrated(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = Self::pool_with(options, max_connections).await?;
        MIGRATOR.run(&pool).await.or_raise(|| ErrorKind::Migration)?;
        Ok(Self { pool })
    }

    /// The underlying pool, for queries not covered by the repository.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection, waiting for checked-out ones to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
