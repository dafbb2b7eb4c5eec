//! Group directory
//!
//! Groups live in the `groups` bucket keyed by id, encoded as JSON. The
//! free functions work inside a caller's transaction so that resolution
//! and import can read groups alongside schedule entries; [`Directory`]
//! wraps each of them in its own transaction.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ringroute::directory::Directory;
//! use ringroute::models::Group;
//!
//! let directory = Directory::new(store);
//! directory.put(&Group::new("g1", "Support", "US/Eastern").with_default_target("000"))?;
//! let group = directory.get("g1")?;
//! ```

use crate::error::{Error, Result};
use crate::models::Group;
use crate::store::{Bucket, ReadTxn, SharedStore, StoreExt, WriteTxn};

/// Look up a group, `None` if absent
pub fn find_group<T: ReadTxn + ?Sized>(txn: &T, id: &str) -> Result<Option<Group>> {
    match txn.get(&Bucket::groups(), id.as_bytes())? {
        Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
        None => Ok(None),
    }
}

/// Look up a group, signalling [`Error::NotFound`] if absent
pub fn get_group<T: ReadTxn + ?Sized>(txn: &T, id: &str) -> Result<Group> {
    find_group(txn, id)?.ok_or_else(|| Error::group_not_found(id))
}

/// Insert or overwrite a group
pub fn put_group<T: WriteTxn + ?Sized>(txn: &mut T, group: &Group) -> Result<()> {
    group.validate()?;
    let value = serde_json::to_vec(group)?;
    txn.put(&Bucket::groups(), group.id.as_bytes(), &value)?;
    Ok(())
}

/// Remove a group together with its schedules. Returns whether the group
/// existed.
pub fn delete_group<T: WriteTxn + ?Sized>(txn: &mut T, id: &str) -> Result<bool> {
    let existed = txn.delete(&Bucket::groups(), id.as_bytes())?;
    let days = txn.delete_bucket(&Bucket::days(id))?;
    let dates = txn.delete_bucket(&Bucket::dates(id))?;
    if existed {
        tracing::info!(group = %id, days, dates, "Group deleted");
    }
    Ok(existed)
}

/// All groups in id order
pub fn list_groups<T: ReadTxn + ?Sized>(txn: &T) -> Result<Vec<Group>> {
    txn.scan(&Bucket::groups())?
        .into_iter()
        .map(|(_, value)| Ok(serde_json::from_slice(&value)?))
        .collect()
}

/// Group CRUD over a shared store
#[derive(Clone)]
pub struct Directory {
    store: SharedStore,
}

impl Directory {
    /// Create a directory over `store`
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Get a group by id
    pub fn get(&self, id: &str) -> Result<Group> {
        self.store.view(|txn| get_group(txn, id))
    }

    /// Insert or overwrite a group
    pub fn put(&self, group: &Group) -> Result<()> {
        self.store.update(|txn| put_group(txn, group))?;
        tracing::debug!(group = %group.id, timezone = %group.timezone, "Group saved");
        Ok(())
    }

    /// Delete a group and its schedules
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.store.update(|txn| delete_group(txn, id))
    }

    /// List all groups
    pub fn list(&self) -> Result<Vec<Group>> {
        self.store.view(|txn| list_groups(txn))
    }
}
