//! SQLite-backed ordered store
//!
//! All buckets share one `kv` table keyed by `(bucket, key)`. SQLite
//! compares BLOBs bytewise, so `ORDER BY key` and `BETWEEN` give the same
//! ordering as the in-memory backend.
//!
//! Writes go through one shared connection. A file-backed store gives each
//! read transaction its own connection; with WAL, readers see the last
//! committed snapshot while an import is still running.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use super::{Bucket, KvPair, OrderedStore, ReadTxn, StoreError, StoreResult, WriteTxn};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Ordered store persisted in a SQLite database file
pub struct SqliteStore {
    /// Writer connection; an in-memory store also reads through it
    conn: Mutex<Connection>,

    /// Database file for reader connections, `None` for in-memory stores
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        store.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite store initialized");
        Ok(store)
    }

    /// Create in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Create database schema
    fn create_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS kv (
                    bucket TEXT NOT NULL,
                    key BLOB NOT NULL,
                    value BLOB NOT NULL,
                    PRIMARY KEY (bucket, key)
                ) WITHOUT ROWID;
                "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Poisoned("sqlite connection"))
    }

    fn reader(&self) -> StoreResult<Handle<'_>> {
        match &self.path {
            Some(path) => {
                let conn = Connection::open(path)?;
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn.execute_batch("PRAGMA query_only = ON;")?;
                Ok(Handle::Owned(conn))
            }
            None => Ok(Handle::Shared(self.lock()?)),
        }
    }

    fn begin<'a>(conn: Handle<'a>, statement: &str) -> StoreResult<SqliteTxn<'a>> {
        conn.execute_batch(statement)?;
        Ok(SqliteTxn { conn, open: true })
    }
}

impl OrderedStore for SqliteStore {
    fn begin_read(&self) -> StoreResult<Box<dyn ReadTxn + '_>> {
        Ok(Box::new(Self::begin(self.reader()?, "BEGIN DEFERRED")?))
    }

    fn begin_write(&self) -> StoreResult<Box<dyn WriteTxn + '_>> {
        Ok(Box::new(Self::begin(
            Handle::Shared(self.lock()?),
            "BEGIN IMMEDIATE",
        )?))
    }
}

/// The connection a transaction runs on
enum Handle<'a> {
    Shared(MutexGuard<'a, Connection>),
    Owned(Connection),
}

impl Deref for Handle<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            Self::Shared(guard) => &**guard,
            Self::Owned(conn) => conn,
        }
    }
}

/// An open SQLite transaction
struct SqliteTxn<'a> {
    conn: Handle<'a>,
    open: bool,
}

impl SqliteTxn<'_> {
    fn collect(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> StoreResult<Vec<KvPair>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<KvPair>, _>>()?;
        Ok(rows)
    }
}

impl ReadTxn for SqliteTxn<'_> {
    fn get(&self, bucket: &Bucket, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE bucket = ?1 AND key = ?2",
                params![bucket.name(), key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn range(&self, bucket: &Bucket, from: &[u8], to: &[u8]) -> StoreResult<Vec<KvPair>> {
        self.collect(
            "SELECT key, value FROM kv
             WHERE bucket = ?1 AND key BETWEEN ?2 AND ?3
             ORDER BY key",
            params![bucket.name(), from, to],
        )
    }

    fn scan(&self, bucket: &Bucket) -> StoreResult<Vec<KvPair>> {
        self.collect(
            "SELECT key, value FROM kv WHERE bucket = ?1 ORDER BY key",
            params![bucket.name()],
        )
    }
}

impl WriteTxn for SqliteTxn<'_> {
    fn put(&mut self, bucket: &Bucket, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.conn.execute(
            r#"
                INSERT INTO kv (bucket, key, value)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(bucket, key) DO UPDATE SET value = excluded.value
                "#,
            params![bucket.name(), key, value],
        )?;
        Ok(())
    }

    fn delete(&mut self, bucket: &Bucket, key: &[u8]) -> StoreResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM kv WHERE bucket = ?1 AND key = ?2",
            params![bucket.name(), key],
        )?;
        Ok(removed > 0)
    }

    fn delete_bucket(&mut self, bucket: &Bucket) -> StoreResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM kv WHERE bucket = ?1", params![bucket.name()])?;
        Ok(removed)
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }
}

impl Drop for SqliteTxn<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "Failed to roll back SQLite transaction");
            }
        }
    }
}
