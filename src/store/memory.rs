//! In-memory ordered store
//!
//! Each bucket is a `BTreeMap`. Readers hold an `Arc` to the snapshot that
//! was current when they started; the single writer edits a private copy
//! and swaps it in on commit.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use super::{Bucket, KvPair, OrderedStore, ReadTxn, StoreError, StoreResult, WriteTxn};

type Snapshot = BTreeMap<Bucket, BTreeMap<Vec<u8>, Vec<u8>>>;

/// Ordered store kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> StoreResult<Arc<Snapshot>> {
        let current = self
            .current
            .read()
            .map_err(|_| StoreError::Poisoned("memory snapshot"))?;
        Ok(Arc::clone(&current))
    }

    /// Number of keys across all buckets
    pub fn len(&self) -> usize {
        self.snapshot()
            .map(|snap| snap.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OrderedStore for MemoryStore {
    fn begin_read(&self) -> StoreResult<Box<dyn ReadTxn + '_>> {
        Ok(Box::new(MemoryReadTxn {
            snapshot: self.snapshot()?,
        }))
    }

    fn begin_write(&self) -> StoreResult<Box<dyn WriteTxn + '_>> {
        let guard = self
            .writer
            .lock()
            .map_err(|_| StoreError::Poisoned("memory writer"))?;
        let working = (*self.snapshot()?).clone();
        Ok(Box::new(MemoryWriteTxn {
            store: self,
            _writer: guard,
            working,
        }))
    }
}

fn get_in(snapshot: &Snapshot, bucket: &Bucket, key: &[u8]) -> Option<Vec<u8>> {
    snapshot.get(bucket).and_then(|b| b.get(key)).cloned()
}

fn range_in(snapshot: &Snapshot, bucket: &Bucket, from: &[u8], to: &[u8]) -> Vec<KvPair> {
    // BTreeMap::range panics on an inverted range
    if from > to {
        return Vec::new();
    }
    snapshot
        .get(bucket)
        .map(|b| {
            b.range::<[u8], _>((
                std::ops::Bound::Included(from),
                std::ops::Bound::Included(to),
            ))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
        })
        .unwrap_or_default()
}

fn scan_in(snapshot: &Snapshot, bucket: &Bucket) -> Vec<KvPair> {
    snapshot
        .get(bucket)
        .map(|b| b.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

struct MemoryReadTxn {
    snapshot: Arc<Snapshot>,
}

impl ReadTxn for MemoryReadTxn {
    fn get(&self, bucket: &Bucket, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(get_in(&self.snapshot, bucket, key))
    }

    fn range(&self, bucket: &Bucket, from: &[u8], to: &[u8]) -> StoreResult<Vec<KvPair>> {
        Ok(range_in(&self.snapshot, bucket, from, to))
    }

    fn scan(&self, bucket: &Bucket) -> StoreResult<Vec<KvPair>> {
        Ok(scan_in(&self.snapshot, bucket))
    }
}

struct MemoryWriteTxn<'a> {
    store: &'a MemoryStore,
    _writer: MutexGuard<'a, ()>,
    working: Snapshot,
}

impl ReadTxn for MemoryWriteTxn<'_> {
    fn get(&self, bucket: &Bucket, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(get_in(&self.working, bucket, key))
    }

    fn range(&self, bucket: &Bucket, from: &[u8], to: &[u8]) -> StoreResult<Vec<KvPair>> {
        Ok(range_in(&self.working, bucket, from, to))
    }

    fn scan(&self, bucket: &Bucket) -> StoreResult<Vec<KvPair>> {
        Ok(scan_in(&self.working, bucket))
    }
}

impl WriteTxn for MemoryWriteTxn<'_> {
    fn put(&mut self, bucket: &Bucket, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.working
            .entry(bucket.clone())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, bucket: &Bucket, key: &[u8]) -> StoreResult<bool> {
        Ok(self
            .working
            .get_mut(bucket)
            .map(|b| b.remove(key).is_some())
            .unwrap_or(false))
    }

    fn delete_bucket(&mut self, bucket: &Bucket) -> StoreResult<usize> {
        Ok(self.working.remove(bucket).map(|b| b.len()).unwrap_or(0))
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryWriteTxn {
            store,
            _writer,
            working,
        } = *self;
        let mut current = store
            .current
            .write()
            .map_err(|_| StoreError::Poisoned("memory snapshot"))?;
        *current = Arc::new(working);
        Ok(())
    }
}
