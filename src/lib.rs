//! # kvadmin - An Administrative Shell for an Ordered Key-Value Store
//!
//! kvadmin inspects, mutates, backs up and restores the contents of an
//! ordered JSON key-value store, either one command at a time from the
//! process arguments or through an interactive prompt.
//!
//! ## Features
//!
//! - **Composite Keys**: Keys are ordered sequences of text, integer,
//!   boolean or byte parts
//! - **Prefix Scans**: `list`, `dump` and `clear` operate on every key under
//!   a prefix, in ascending key order
//! - **Backup / Restore**: `dump` prints a JSON array that `restore` reads
//!   back from a file or standard input
//! - **Pluggable Store**: Handlers talk to `dyn KvStore`, so an in-memory
//!   engine can stand in for the file-backed one
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              kvadmin                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ ReplSession │───>│  Tokenizer  │───>│  Command    │                  │
//! │  │ / run_once  │    │  KeyCodec   │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                          dump/restore/clear   │ get/set/delete/scan     │
//! │                                               ▼                         │
//! │                     ┌──────────────────────────────────────────────┐   │
//! │                     │              dyn KvStore                     │   │
//! │                     │   StorageEngine: BTreeMap + JSON snapshot    │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use kvadmin::commands::{CommandHandler, Reply};
//! use kvadmin::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let handler = CommandHandler::new(Arc::new(StorageEngine::new()));
//! let mut stdin = tokio::io::empty();
//!
//! handler.execute_line(r#"add users ada {"admin":true}"#, &mut stdin).await;
//! let reply = handler.execute_line("get users ada", &mut stdin).await;
//! assert_eq!(reply, Reply::text(r#"Value for key users, ada: {"admin":true}"#));
//! # });
//! ```
//!
//! ## Supported Commands
//!
//! - `list [part ...]`
//! - `add part [part ...] <JSON>`
//! - `get part [part ...]`
//! - `delete part [part ...]`
//! - `dump [part ...]`
//! - `restore [file]`
//! - `clear [part ...]`
//! - `exit`
//!
//! ## Module Overview
//!
//! - [`protocol`]: Tokenizer, key types and key codec
//! - [`storage`]: Store trait, prefix cursor and the ordered engine
//! - [`commands`]: Command dispatch and bulk serialization
//! - [`repl`]: Interactive loop and one-shot execution

pub mod commands;
pub mod protocol;
pub mod repl;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandHandler, Reply};
pub use protocol::{tokenize, Entry, Key, KeyPart, Tokenizer};
pub use repl::{run_once, ReplSession, SessionStats};
pub use storage::{KvStore, StorageEngine, StoreError};

/// The data file used when neither `--data` nor `KVADMIN_DATA` is given
pub const DEFAULT_DATA_FILE: &str = "kvadmin.json";

/// Environment variable naming the data file
pub const DATA_ENV_VAR: &str = "KVADMIN_DATA";

/// Version of kvadmin
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
