//! Ordered Storage Engine
//!
//! This module implements the concrete store behind the [`KvStore`] trait.
//! Entries live in a `BTreeMap` keyed by composite [`Key`], so ascending
//! iteration and prefix ranges come straight from the map's ordering.
//!
//! ## Durability
//!
//! An engine is either volatile ([`StorageEngine::new`]) or file-backed
//! ([`StorageEngine::open`]). A file-backed engine loads a JSON snapshot on
//! open and rewrites it after every mutation:
//!
//! ```text
//!   set / delete
//!        │
//!        ▼
//! ┌──────────────┐   serialize   ┌──────────────┐   rename   ┌──────────────┐
//! │ BTreeMap     │──────────────>│ <path>.tmp   │───────────>│ <path>       │
//! │ (RwLock)     │               └──────────────┘            └──────────────┘
//! └──────────────┘
//! ```
//!
//! The snapshot uses the same `[{"key": [...], "value": ...}]` layout as the
//! `dump` command, so a data file can be inspected or restored by hand.
//!
//! Every mutation rewrites the whole snapshot, so a bulk `restore` or `clear`
//! of N entries writes O(N²) bytes in total. If the snapshot cannot be
//! written, the mutation is rolled back in memory and the error returned.

use crate::protocol::types::{Entry, Key};
use crate::storage::adapter::{KvStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

/// Statistics about storage operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub keys: u64,
    pub get_ops: u64,
    pub set_ops: u64,
    pub del_ops: u64,
    pub scan_ops: u64,
}

/// The ordered key-value engine.
///
/// # Example
///
/// ```
/// use kvadmin::protocol::Key;
/// use kvadmin::storage::{KvStore, StorageEngine};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let engine = StorageEngine::new();
/// let key: Key = ["users", "ada"].into_iter().collect();
///
/// engine.set(key.clone(), json!({"admin": true})).await.unwrap();
/// let entry = engine.get(&key).await.unwrap().unwrap();
/// assert_eq!(entry.value["admin"], true);
/// # });
/// ```
pub struct StorageEngine {
    /// Entries in ascending key order
    data: RwLock<BTreeMap<Key, Value>>,

    /// Snapshot file; `None` for a volatile engine
    path: Option<PathBuf>,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: total DELETE operations
    del_count: AtomicU64,

    /// Statistics: total scan pages served
    scan_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("path", &self.path)
            .field("keys", &self.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty, volatile engine.
    pub fn new() -> Self {
        Self::with_data(BTreeMap::new(), None)
    }

    fn with_data(data: BTreeMap<Key, Value>, path: Option<PathBuf>) -> Self {
        Self {
            data: RwLock::new(data),
            path,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            scan_count: AtomicU64::new(0),
        }
    }

    /// Opens a file-backed engine.
    ///
    /// A missing or blank file yields an empty store; the file is created on
    /// the first mutation. Anything else that is not a valid entry array is
    /// an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let data = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => {
                let entries: Vec<Entry> = serde_json::from_slice(&bytes)?;
                entries.into_iter().map(|e| (e.key, e.value)).collect()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        debug!(path = %path.display(), keys = data.len(), "Opened store");
        Ok(Self::with_data(data, Some(path)))
    }

    /// The snapshot file, if this engine is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        match self.data.read() {
            Ok(data) => data.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns operation statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len() as u64,
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            scan_ops: self.scan_count.load(Ordering::Relaxed),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<Key, Value>>, StoreError> {
        self.data.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<Key, Value>>, StoreError> {
        self.data.write().map_err(|_| StoreError::Poisoned)
    }

    /// Rewrites the snapshot file, if any.
    async fn persist(&self) -> Result<(), StoreError> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };

        // Serialize under the lock, write without it
        let snapshot = {
            let data = self.read()?;
            let entries: Vec<Entry> = data
                .iter()
                .map(|(k, v)| Entry::new(k.clone(), v.clone()))
                .collect();
            serde_json::to_vec_pretty(&entries)?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &snapshot).await?;
        tokio::fs::rename(&tmp, path).await?;

        trace!(path = %path.display(), bytes = snapshot.len(), "Snapshot written");
        Ok(())
    }

    /// Puts a key back the way it was before a mutation whose snapshot
    /// could not be written.
    fn restore_previous(&self, key: Key, previous: Option<Value>) -> Result<(), StoreError> {
        let mut data = self.write()?;
        match previous {
            Some(value) => data.insert(key, value),
            None => data.remove(&key),
        };
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[async_trait]
impl KvStore for StorageEngine {
    async fn get(&self, key: &Key) -> Result<Option<Entry>, StoreError> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let data = self.read()?;
        Ok(data.get(key).map(|value| Entry::new(key.clone(), value.clone())))
    }

    async fn set(&self, key: Key, value: Value) -> Result<(), StoreError> {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let previous = self.write()?.insert(key.clone(), value);
        if let Err(e) = self.persist().await {
            self.restore_previous(key, previous)?;
            return Err(e);
        }
        Ok(())
    }

    async fn delete(&self, key: &Key) -> Result<(), StoreError> {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let removed = self.write()?.remove(key);
        if removed.is_none() {
            return Ok(());
        }

        if let Err(e) = self.persist().await {
            self.restore_previous(key.clone(), removed)?;
            return Err(e);
        }
        Ok(())
    }

    async fn scan(
        &self,
        prefix: &Key,
        after: Option<&Key>,
        limit: usize,
    ) -> Result<Vec<Entry>, StoreError> {
        self.scan_count.fetch_add(1, Ordering::Relaxed);

        let start = match after {
            Some(after) if after >= prefix => Bound::Excluded(after.clone()),
            _ => Bound::Included(prefix.clone()),
        };

        let data = self.read()?;
        let page = data
            .range((start, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, value)| Entry::new(key.clone(), value.clone()))
            .collect();

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::KeyPart;
    use serde_json::json;

    fn key(parts: &[&str]) -> Key {
        parts.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let engine = StorageEngine::new();
        engine.set(key(&["name"]), json!("Ariz")).await.unwrap();

        let entry = engine.get(&key(&["name"])).await.unwrap();
        assert_eq!(entry, Some(Entry::new(key(&["name"]), json!("Ariz"))));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let engine = StorageEngine::new();
        assert_eq!(engine.get(&key(&["missing"])).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let engine = StorageEngine::new();
        engine.set(key(&["k"]), json!(1)).await.unwrap();
        engine.set(key(&["k"]), json!(2)).await.unwrap();

        assert_eq!(engine.len(), 1);
        let entry = engine.get(&key(&["k"])).await.unwrap().unwrap();
        assert_eq!(entry.value, json!(2));
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let engine = StorageEngine::new();
        engine.delete(&key(&["nope"])).await.unwrap();

        engine.set(key(&["k"]), json!(true)).await.unwrap();
        engine.delete(&key(&["k"])).await.unwrap();
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_scan_respects_prefix_and_order() {
        let engine = StorageEngine::new();
        engine.set(key(&["b"]), json!(0)).await.unwrap();
        engine.set(key(&["a", "2"]), json!(2)).await.unwrap();
        engine.set(key(&["a", "1"]), json!(1)).await.unwrap();
        engine.set(key(&["a"]), json!("self")).await.unwrap();
        engine.set(key(&["ab"]), json!("sibling")).await.unwrap();

        let page = engine.scan(&key(&["a"]), None, 10).await.unwrap();
        let keys: Vec<Key> = page.into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![key(&["a"]), key(&["a", "1"]), key(&["a", "2"])]);

        let page = engine.scan(&key(&["a"]), Some(&key(&["a", "1"])), 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].key, key(&["a", "2"]));
    }

    #[tokio::test]
    async fn test_scan_mixed_part_types() {
        let engine = StorageEngine::new();
        let parts = vec![
            KeyPart::boolean(true),
            KeyPart::integer(3),
            KeyPart::text("t"),
            KeyPart::bytes(vec![9]),
        ];
        for part in &parts {
            engine
                .set(Key::new(vec![KeyPart::text("p"), part.clone()]), json!(null))
                .await
                .unwrap();
        }

        let page = engine.scan(&key(&["p"]), None, 10).await.unwrap();
        let tails: Vec<KeyPart> = page.into_iter().map(|e| e.key.parts()[1].clone()).collect();
        assert_eq!(
            tails,
            vec![
                KeyPart::bytes(vec![9]),
                KeyPart::text("t"),
                KeyPart::integer(3),
                KeyPart::boolean(true),
            ]
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let engine = StorageEngine::new();
        engine.set(key(&["k"]), json!(1)).await.unwrap();
        engine.get(&key(&["k"])).await.unwrap();
        engine.delete(&key(&["k"])).await.unwrap();

        let stats = engine.stats();
        assert_eq!(stats.keys, 0);
        assert_eq!(stats.set_ops, 1);
        assert_eq!(stats.get_ops, 1);
        assert_eq!(stats.del_ops, 1);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StorageEngine::open(dir.path().join("data.json")).await.unwrap();
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_file_backed_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");

        {
            let engine = StorageEngine::open(&path).await.unwrap();
            engine.set(key(&["users", "ada"]), json!({"admin": true})).await.unwrap();
            engine.set(key(&["users", "bob"]), json!(null)).await.unwrap();
            engine.delete(&key(&["users", "bob"])).await.unwrap();
        }

        let reopened = StorageEngine::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 1);
        let entry = reopened.get(&key(&["users", "ada"])).await.unwrap().unwrap();
        assert_eq!(entry.value, json!({"admin": true}));
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_failed_snapshot_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        let engine = StorageEngine::open(sub.join("data.json")).await.unwrap();
        engine.set(key(&["kept"]), json!(1)).await.unwrap();

        // Make the snapshot directory unusable
        std::fs::remove_dir_all(&sub).unwrap();
        std::fs::write(&sub, b"not a directory").unwrap();

        assert!(engine.set(key(&["new"]), json!(2)).await.is_err());
        assert!(engine.get(&key(&["new"])).await.unwrap().is_none());

        assert!(engine.set(key(&["kept"]), json!(3)).await.is_err());
        let entry = engine.get(&key(&["kept"])).await.unwrap().unwrap();
        assert_eq!(entry.value, json!(1));

        assert!(engine.delete(&key(&["kept"])).await.is_err());
        assert!(engine.get(&key(&["kept"])).await.unwrap().is_some());
        assert_eq!(engine.len(), 1);
    }

    #[tokio::test]
    async fn test_open_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, b"{\"not\": \"an array\"}").unwrap();

        let result = StorageEngine::open(&path).await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }
}
