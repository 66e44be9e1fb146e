//! Store Adapter
//!
//! The boundary between the command layer and the ordered key-value engine.
//! Handlers only ever see `dyn KvStore`, so a real engine and an in-memory
//! test double are interchangeable.
//!
//! ## Prefix Scans
//!
//! `list_by_prefix` returns a [`PrefixScan`] cursor rather than a collected
//! list. The cursor pages through [`KvStore::scan`] in ascending key order,
//! remembering only the last key it yielded. Consequences:
//!
//! - every call starts an independent scan from the beginning of the prefix;
//! - deleting the entry just yielded (as `clear` does) cannot disturb the
//!   cursor;
//! - the scan ends at the first batch that comes back short.

use crate::protocol::types::{Entry, Key};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Number of entries fetched per page by [`PrefixScan`].
pub const SCAN_BATCH_SIZE: usize = 128;

/// Errors raised by the store engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure while loading or saving
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk snapshot is not a valid entry array
    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// A lock guarding the engine state was poisoned
    #[error("store state is poisoned")]
    Poisoned,

    /// The engine is unreachable or refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Operations the command layer needs from an ordered key-value engine.
///
/// Keys compare with [`Key`]'s ordering. All methods may suspend while the
/// engine completes the call.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads the entry at an exact key.
    async fn get(&self, key: &Key) -> Result<Option<Entry>, StoreError>;

    /// Writes a value, replacing any existing value at the key.
    async fn set(&self, key: Key, value: Value) -> Result<(), StoreError>;

    /// Removes a key. Removing an absent key succeeds.
    async fn delete(&self, key: &Key) -> Result<(), StoreError>;

    /// Returns up to `limit` entries under `prefix` whose keys sort strictly
    /// after `after` (or from the start of the prefix when `after` is None),
    /// in ascending key order.
    async fn scan(
        &self,
        prefix: &Key,
        after: Option<&Key>,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError>;
}

/// Starts a lazy ascending scan over every entry whose key starts with `prefix`.
pub fn list_by_prefix(store: &dyn KvStore, prefix: Key) -> PrefixScan<'_> {
    PrefixScan::new(store, prefix, SCAN_BATCH_SIZE)
}

/// A lazy, finite cursor over the entries under a prefix.
pub struct PrefixScan<'a> {
    store: &'a dyn KvStore,
    prefix: Key,
    batch_size: usize,
    /// Buffered page, stored reversed so `pop` yields ascending order
    buffer: Vec<Entry>,
    /// Last key handed out; the next page starts after it
    last_key: Option<Key>,
    exhausted: bool,
}

impl<'a> PrefixScan<'a> {
    pub fn new(store: &'a dyn KvStore, prefix: Key, batch_size: usize) -> Self {
        Self {
            store,
            prefix,
            batch_size: batch_size.max(1),
            buffer: Vec::new(),
            last_key: None,
            exhausted: false,
        }
    }

    /// Returns the next entry, or `None` once no more keys share the prefix.
    pub async fn next(&mut self) -> Result<Option<Entry>, StoreError> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fill().await?;
        }

        match self.buffer.pop() {
            Some(entry) => {
                self.last_key = Some(entry.key.clone());
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Drains the remaining entries into a vector.
    pub async fn collect(mut self) -> Result<Vec<Entry>, StoreError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next().await? {
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn fill(&mut self) -> Result<(), StoreError> {
        let mut page = self
            .store
            .scan(&self.prefix, self.last_key.as_ref(), self.batch_size)
            .await?;

        if page.len() < self.batch_size {
            self.exhausted = true;
        }

        page.reverse();
        self.buffer = page;
        Ok(())
    }
}

impl std::fmt::Debug for PrefixScan<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixScan")
            .field("prefix", &self.prefix)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
