//! Bulk Serialization: dump, restore, clear
//!
//! These commands move many entries at once using the interchange format:
//!
//! ```text
//! [
//!   { "key": ["users", "ada"], "value": { "admin": true } },
//!   { "key": ["users", "bob"], "value": null }
//! ]
//! ```
//!
//! ## Error Policy
//!
//! Bulk commands issue one independent store call per entry, strictly in
//! order. A failing or malformed entry is reported and skipped; entries
//! already applied stay applied. Only a failure that makes the whole input
//! unusable (unreadable source, malformed JSON, non-array top level, a
//! failing scan) stops the command.

use crate::commands::reply::Reply;
use crate::protocol::types::{Entry, Key};
use crate::storage::{list_by_prefix, KvStore, StoreError};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, warn};

/// Errors that abort a whole bulk command.
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("expected an array of entries")]
    NotAnArray,
}

/// Where `restore` reads its entries from.
pub enum RestoreSource<'a> {
    /// A JSON file on disk
    File(PathBuf),

    /// Standard input (or any stream standing in for it), read to end
    Stdin(&'a mut (dyn AsyncRead + Unpin + Send)),
}

impl RestoreSource<'_> {
    fn describe(&self) -> &'static str {
        match self {
            RestoreSource::File(_) => "file",
            RestoreSource::Stdin(_) => "stdin",
        }
    }

    async fn read_to_string(self) -> Result<String, std::io::Error> {
        match self {
            RestoreSource::File(path) => tokio::fs::read_to_string(path).await,
            RestoreSource::Stdin(reader) => {
                let mut input = String::new();
                reader.read_to_string(&mut input).await?;
                Ok(input)
            }
        }
    }
}

/// Counts gathered while restoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreStats {
    /// Entries written to the store
    pub applied: usize,
    /// Elements rejected for missing or malformed `key`/`value`
    pub invalid: usize,
    /// Well-formed entries the store failed to write
    pub failed: usize,
}

/// Drains every entry under `prefix` and renders them as a pretty JSON array.
pub async fn dump(store: &dyn KvStore, prefix: Key) -> Result<String, BulkError> {
    let entries = list_by_prefix(store, prefix).collect().await?;
    debug!(entries = entries.len(), "Dump collected");
    Ok(serde_json::to_string_pretty(&entries)?)
}

/// Validates one interchange element.
///
/// The element must be an object with a `key` that decodes to a non-empty
/// key and a `value` field (which may be `null`).
pub fn decode_entry(element: &Value) -> Option<Entry> {
    let object = element.as_object()?;
    let key: Key = serde_json::from_value(object.get("key")?.clone()).ok()?;
    if key.is_empty() {
        return None;
    }
    let value = object.get("value")?.clone();
    Some(Entry::new(key, value))
}

/// Applies every valid element of `elements` with `set`.
pub async fn apply_entries(store: &dyn KvStore, elements: Vec<Value>) -> (RestoreStats, Vec<Reply>) {
    let mut stats = RestoreStats::default();
    let mut replies = Vec::with_capacity(elements.len());

    for element in elements {
        let entry = match decode_entry(&element) {
            Some(entry) => entry,
            None => {
                warn!(element = %element, "Skipping invalid restore entry");
                stats.invalid += 1;
                replies.push(Reply::error(format!("Invalid entry format: {}", element)));
                continue;
            }
        };

        let message = format!("Restored: {} -> {}", entry.key, entry.value);
        let key = entry.key.clone();
        match store.set(entry.key, entry.value).await {
            Ok(()) => {
                stats.applied += 1;
                replies.push(Reply::text(message));
            }
            Err(e) => {
                error!(key = %key, error = %e, "Restore write failed");
                stats.failed += 1;
                replies.push(Reply::error(format!("Failed to restore {}: {}", key, e)));
            }
        }
    }

    (stats, replies)
}

/// Reads a JSON entry array from `source` and applies it.
pub async fn restore(store: &dyn KvStore, source: RestoreSource<'_>) -> (RestoreStats, Reply) {
    let origin = source.describe();

    let elements = match read_elements(source).await {
        Ok(elements) => elements,
        Err(BulkError::NotAnArray) => {
            let scope = if origin == "file" { "file" } else { "input" };
            return (
                RestoreStats::default(),
                Reply::error(format!(
                    "Invalid {} format. Expected an array of entries.",
                    scope
                )),
            );
        }
        Err(e) => {
            error!(source = origin, error = %e, "Restore aborted");
            return (
                RestoreStats::default(),
                Reply::error(format!("Failed to restore from {}: {}", origin, e)),
            );
        }
    };

    let (stats, mut replies) = apply_entries(store, elements).await;
    replies.push(Reply::text(format!(
        "Restored {} entries ({} invalid).",
        stats.applied, stats.invalid
    )));

    (stats, Reply::batch(replies))
}

async fn read_elements(source: RestoreSource<'_>) -> Result<Vec<Value>, BulkError> {
    let input = source.read_to_string().await?;
    match serde_json::from_str::<Value>(&input)? {
        Value::Array(elements) => Ok(elements),
        _ => Err(BulkError::NotAnArray),
    }
}

/// Deletes every entry under `prefix`, reporting each deletion.
///
/// Returns the number of entries removed alongside the reply.
pub async fn clear(store: &dyn KvStore, prefix: Key) -> (usize, Reply) {
    let label = prefix_label(&prefix);
    let mut replies = vec![Reply::text(format!("Clearing entries with prefix: {}", label))];
    let mut scan = list_by_prefix(store, prefix);
    let mut cleared = 0;

    loop {
        let entry = match scan.next().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "Clear aborted");
                replies.push(Reply::error(format!("Failed to clear KV store: {}", e)));
                return (cleared, Reply::batch(replies));
            }
        };

        match store.delete(&entry.key).await {
            Ok(()) => {
                cleared += 1;
                replies.push(Reply::text(format!("Deleted: {}", entry.key)));
            }
            Err(e) => {
                error!(key = %entry.key, error = %e, "Clear delete failed");
                replies.push(Reply::error(format!("Failed to delete {}: {}", entry.key, e)));
            }
        }
    }

    replies.push(Reply::text(format!("Cleared {} entries.", cleared)));
    (cleared, Reply::batch(replies))
}

/// Human label for a prefix: its parts, or `none` when empty.
pub fn prefix_label(prefix: &Key) -> String {
    if prefix.is_empty() {
        "none".to_string()
    } else {
        prefix.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageEngine;
    use async_trait::async_trait;
    use serde_json::json;

    fn key(parts: &[&str]) -> Key {
        parts.iter().copied().collect()
    }

    /// Wraps an engine and fails writes and deletes of chosen keys.
    struct FailingKeys {
        inner: StorageEngine,
        fail_on: Vec<Key>,
    }

    impl FailingKeys {
        fn new(inner: StorageEngine, fail_on: Vec<Key>) -> Self {
            Self { inner, fail_on }
        }

        fn check(&self, key: &Key) -> Result<(), StoreError> {
            if self.fail_on.contains(key) {
                return Err(StoreError::Unavailable(format!("rejected {}", key)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KvStore for FailingKeys {
        async fn get(&self, key: &Key) -> Result<Option<Entry>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: Key, value: Value) -> Result<(), StoreError> {
            self.check(&key)?;
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &Key) -> Result<(), StoreError> {
            self.check(key)?;
            self.inner.delete(key).await
        }

        async fn scan(
            &self,
            prefix: &Key,
            after: Option<&Key>,
            limit: usize,
        ) -> Result<Vec<Entry>, StoreError> {
            self.inner.scan(prefix, after, limit).await
        }
    }

    async fn seeded() -> StorageEngine {
        let engine = StorageEngine::new();
        engine.set(key(&["users", "ada"]), json!({"admin": true})).await.unwrap();
        engine.set(key(&["users", "bob"]), json!(0)).await.unwrap();
        engine.set(key(&["config"]), json!("x")).await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_dump_prefix() {
        let engine = seeded().await;
        let text = dump(&engine, key(&["users"])).await.unwrap();

        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            parsed,
            json!([
                {"key": ["users", "ada"], "value": {"admin": true}},
                {"key": ["users", "bob"], "value": 0}
            ])
        );
        assert!(text.contains("\n  {"));
    }

    #[tokio::test]
    async fn test_dump_empty_store() {
        let engine = StorageEngine::new();
        assert_eq!(dump(&engine, Key::empty()).await.unwrap(), "[]");
    }

    #[test]
    fn test_decode_entry() {
        assert!(decode_entry(&json!({"key": ["a"], "value": 1})).is_some());
        assert!(decode_entry(&json!({"key": ["a"], "value": null})).is_some());
        assert!(decode_entry(&json!({"key": ["a"], "value": false})).is_some());
        assert!(decode_entry(&json!({"key": ["a"]})).is_none());
        assert!(decode_entry(&json!({"key": [], "value": 1})).is_none());
        assert!(decode_entry(&json!({"key": "a", "value": 1})).is_none());
        assert!(decode_entry(&json!({"value": 1})).is_none());
        assert!(decode_entry(&json!([1, 2])).is_none());
    }

    #[tokio::test]
    async fn test_restore_skips_invalid_entry() {
        let engine = StorageEngine::new();
        let input = r#"[{"key": ["a"], "value": {"x": 1}}, {"key": ["b"]}]"#;
        let mut reader = input.as_bytes();

        let (stats, reply) = restore(&engine, RestoreSource::Stdin(&mut reader)).await;

        assert_eq!(stats, RestoreStats { applied: 1, invalid: 1, failed: 0 });
        assert!(reply.has_error());
        assert_eq!(engine.len(), 1);
        let entry = engine.get(&key(&["a"])).await.unwrap().unwrap();
        assert_eq!(entry.value, json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_restore_rejects_non_array() {
        let engine = StorageEngine::new();
        let mut reader = &b"{\"key\": [\"a\"], \"value\": 1}"[..];

        let (stats, reply) = restore(&engine, RestoreSource::Stdin(&mut reader)).await;

        assert_eq!(stats, RestoreStats::default());
        assert_eq!(
            reply,
            Reply::error("Invalid input format. Expected an array of entries.")
        );
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_restore_malformed_json() {
        let engine = StorageEngine::new();
        let mut reader = &b"[{"[..];

        let (_, reply) = restore(&engine, RestoreSource::Stdin(&mut reader)).await;
        match reply {
            Reply::Error(msg) => assert!(msg.starts_with("Failed to restore from stdin:")),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_restore_missing_file() {
        let engine = StorageEngine::new();
        let dir = tempfile::tempdir().unwrap();
        let source = RestoreSource::File(dir.path().join("missing.json"));

        let (_, reply) = restore(&engine, source).await;
        match reply {
            Reply::Error(msg) => assert!(msg.starts_with("Failed to restore from file:")),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dump_restore_roundtrip() {
        let source = seeded().await;
        let text = dump(&source, Key::empty()).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.json");
        std::fs::write(&path, &text).unwrap();

        let target = StorageEngine::new();
        let (stats, _) = restore(&target, RestoreSource::File(path)).await;
        assert_eq!(stats.applied, 3);

        let before = list_by_prefix(&source, Key::empty()).collect().await.unwrap();
        let after = list_by_prefix(&target, Key::empty()).collect().await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_clear_prefix() {
        let engine = seeded().await;

        let (cleared, reply) = clear(&engine, key(&["users"])).await;

        assert_eq!(cleared, 2);
        assert!(!reply.has_error());
        assert!(list_by_prefix(&engine, key(&["users"])).collect().await.unwrap().is_empty());
        assert_eq!(engine.len(), 1);
        assert_eq!(
            reply,
            Reply::batch(vec![
                Reply::text("Clearing entries with prefix: users"),
                Reply::text("Deleted: users, ada"),
                Reply::text("Deleted: users, bob"),
                Reply::text("Cleared 2 entries."),
            ])
        );
    }

    #[tokio::test]
    async fn test_clear_everything() {
        let engine = seeded().await;
        let (cleared, _) = clear(&engine, Key::empty()).await;
        assert_eq!(cleared, 3);
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn test_restore_continues_past_failed_write() {
        let store = FailingKeys::new(StorageEngine::new(), vec![key(&["b"])]);
        let mut reader = &br#"[
            {"key": ["a"], "value": 1},
            {"key": ["b"], "value": 2},
            {"key": ["c"], "value": 3}
        ]"#[..];

        let (stats, reply) = restore(&store, RestoreSource::Stdin(&mut reader)).await;

        assert_eq!(stats, RestoreStats { applied: 2, invalid: 0, failed: 1 });
        assert!(reply.has_error());
        assert!(reply
            .lines()
            .iter()
            .any(|(_, l)| *l == "Failed to restore b: store unavailable: rejected b"));
        assert!(store.inner.get(&key(&["a"])).await.unwrap().is_some());
        assert!(store.inner.get(&key(&["b"])).await.unwrap().is_none());
        assert!(store.inner.get(&key(&["c"])).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_continues_past_failed_delete() {
        let store = FailingKeys::new(seeded().await, vec![key(&["users", "ada"])]);

        let (cleared, reply) = clear(&store, key(&["users"])).await;

        assert_eq!(cleared, 1);
        assert_eq!(
            reply,
            Reply::batch(vec![
                Reply::text("Clearing entries with prefix: users"),
                Reply::error("Failed to delete users, ada: store unavailable: rejected users, ada"),
                Reply::text("Deleted: users, bob"),
                Reply::text("Cleared 1 entries."),
            ])
        );
        assert!(store.inner.get(&key(&["users", "ada"])).await.unwrap().is_some());
        assert_eq!(store.inner.len(), 2);
    }
}
