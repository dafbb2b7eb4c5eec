//! Ordered key-value store abstraction
//!
//! The schedule logic only needs a small contract from its storage:
//! named buckets of byte keys kept in sorted order, inclusive range scans,
//! and transactions where readers see a consistent snapshot and a writer's
//! changes become visible all at once on commit.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │           Directory / Resolver / Importer / Export          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │        OrderedStore  ──►  ReadTxn / WriteTxn                │
//! └─────────────────────────────────────────────────────────────┘
//!                   │                           │
//!                   ▼                           ▼
//!         ┌─────────────────┐         ┌─────────────────┐
//!         │   MemoryStore   │         │   SqliteStore   │
//!         │ (BTreeMap snaps)│         │  (kv table)     │
//!         └─────────────────┘         └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use ringroute::store::{Bucket, MemoryStore, StoreExt};
//!
//! let store = MemoryStore::new();
//! store.update(|txn| {
//!     txn.put(&Bucket::groups(), b"g1", b"{}")?;
//!     Ok(())
//! })?;
//! let value = store.view(|txn| Ok(txn.get(&Bucket::groups(), b"g1")?))?;
//! ```

pub mod memory;
pub mod sqlite;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::error::Result;
use crate::models::ScheduleKind;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// ============================================================================
// Errors
// ============================================================================

/// Failures of a store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite errors
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A thread panicked while holding a store lock
    #[error("Store lock '{0}' poisoned")]
    Poisoned(&'static str),

    /// I/O errors (creating the database directory)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether retrying the operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            Self::Sqlite(_) | Self::Poisoned(_) => false,
            Self::Io(_) => true,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Buckets
// ============================================================================

/// A named, independently ordered collection of keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bucket(String);

impl Bucket {
    /// Group directory
    pub fn groups() -> Self {
        Self("groups".to_string())
    }

    /// Weekly template entries of one group
    pub fn days(group: &str) -> Self {
        Self(format!("days/{group}"))
    }

    /// Date overrides of one group
    pub fn dates(group: &str) -> Self {
        Self(format!("dates/{group}"))
    }

    /// Schedule bucket of one group for the given kind
    pub fn schedule(kind: ScheduleKind, group: &str) -> Self {
        match kind {
            ScheduleKind::Days => Self::days(group),
            ScheduleKind::Dates => Self::dates(group),
        }
    }

    /// Bucket name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// A key and its value, as returned by scans
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Read access to a consistent snapshot of the store
pub trait ReadTxn {
    /// Value stored under `key`
    fn get(&self, bucket: &Bucket, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Entries with `from <= key <= to`, in key order. Empty when
    /// `from > to`.
    fn range(&self, bucket: &Bucket, from: &[u8], to: &[u8]) -> StoreResult<Vec<KvPair>>;

    /// All entries of a bucket, in key order
    fn scan(&self, bucket: &Bucket) -> StoreResult<Vec<KvPair>>;
}

/// Read-write access. Changes are visible to other transactions only
/// after [`WriteTxn::commit`]; dropping an uncommitted transaction rolls
/// it back.
pub trait WriteTxn: ReadTxn {
    /// Insert or overwrite a value
    fn put(&mut self, bucket: &Bucket, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Remove a key, returning whether it existed
    fn delete(&mut self, bucket: &Bucket, key: &[u8]) -> StoreResult<bool>;

    /// Remove every key of a bucket, returning how many were removed
    fn delete_bucket(&mut self, bucket: &Bucket) -> StoreResult<usize>;

    /// Make the transaction's changes visible
    fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// A transactional ordered store
pub trait OrderedStore: Send + Sync {
    /// Start a read-only transaction
    fn begin_read(&self) -> StoreResult<Box<dyn ReadTxn + '_>>;

    /// Start the (single) read-write transaction, waiting for any other
    /// writer to finish
    fn begin_write(&self) -> StoreResult<Box<dyn WriteTxn + '_>>;
}

/// Closure-scoped transactions on top of [`OrderedStore`]
pub trait StoreExt: OrderedStore {
    /// Run `f` inside a read transaction
    fn view<T>(&self, f: impl FnOnce(&dyn ReadTxn) -> Result<T>) -> Result<T> {
        let txn = self.begin_read()?;
        f(&*txn)
    }

    /// Run `f` inside a write transaction, committing only if it succeeds
    fn update<T>(&self, f: impl FnOnce(&mut dyn WriteTxn) -> Result<T>) -> Result<T> {
        let mut txn = self.begin_write()?;
        let value = f(&mut *txn)?;
        txn.commit()?;
        Ok(value)
    }
}

impl<S: OrderedStore + ?Sized> StoreExt for S {}

/// Thread-safe shared store handle
pub type SharedStore = Arc<dyn OrderedStore>;

/// Open the store selected by the configuration
pub fn open_store(config: &DatabaseConfig) -> Result<SharedStore> {
    let store: SharedStore = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.path)?),
    };
    tracing::debug!(backend = ?config.backend, "Store opened");
    Ok(store)
}

// ============================================================================
// Tests
// ============================================================================
