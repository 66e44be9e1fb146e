//! Storage Module
//!
//! This module provides the store boundary used by every command handler.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 CommandHandler / bulk ops                   │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │ Arc<dyn KvStore>
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  KvStore trait        get · set · delete · scan             │
//! │  PrefixScan           lazy ascending cursor over scan()     │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  StorageEngine        BTreeMap<Key, Value> + JSON snapshot  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use kvadmin::protocol::Key;
//! use kvadmin::storage::{list_by_prefix, KvStore, StorageEngine};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let engine = StorageEngine::new();
//! engine.set(["users", "ada"].into_iter().collect(), json!(1)).await.unwrap();
//! engine.set(["users", "bob"].into_iter().collect(), json!(2)).await.unwrap();
//!
//! let prefix: Key = ["users"].into_iter().collect();
//! let entries = list_by_prefix(&engine, prefix).collect().await.unwrap();
//! assert_eq!(entries.len(), 2);
//! # });
//! ```

pub mod adapter;
pub mod engine;

// Re-export commonly used types
pub use adapter::{list_by_prefix, KvStore, PrefixScan, StoreError, SCAN_BATCH_SIZE};
pub use engine::{StorageEngine, StorageStats};
