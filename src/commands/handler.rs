//! Command Handler Module
//!
//! This module implements every administrative command. It tokenizes an
//! incoming line, dispatches on the command name and runs the matching
//! handler against the store.
//!
//! ## Supported Commands
//!
//! - `list [part ...]` - Print entries under a prefix
//! - `add part [part ...] <JSON>` - Set a key to a JSON value
//! - `get part [part ...]` - Print the value at a key
//! - `delete part [part ...]` - Remove a key
//! - `dump [part ...]` - Print entries under a prefix as a JSON array
//! - `restore [file]` - Load a JSON entry array from a file or stdin
//! - `clear [part ...]` - Delete every entry under a prefix
//! - `exit` - Leave the interactive loop
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ tokenize()  │───>│ dispatch()  │───>│  cmd_*()    │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                        dyn KvStore          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every handler validates its arguments before touching the store, and
//! every failure is turned into a [`Reply::Error`] here; nothing propagates
//! out to the session loop.

use crate::commands::reply::Reply;
use crate::commands::serialization::{self, prefix_label, RestoreSource};
use crate::protocol::codec::{self, CodecError};
use crate::protocol::tokenizer::tokenize;
use crate::storage::{list_by_prefix, KvStore, StoreError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, error};

/// Names of all recognized commands, in help order.
pub const COMMANDS: &[&str] = &[
    "list", "add", "get", "delete", "dump", "restore", "clear", "exit",
];

const USAGE_ADD: &str = "Usage: add <key1> <key2> ... <JSON>";
const USAGE_GET: &str = "Usage: get <key1> <key2> ...";
const USAGE_DELETE: &str = "Usage: delete <key1> <key2> ...";
const USAGE_RESTORE: &str = "Usage: restore [file]";
const INVALID_JSON: &str = "Invalid JSON format. Please provide a valid JSON string.";
const GOODBYE: &str = "Exiting REPL. Goodbye!";

/// The help line printed for unknown commands.
pub fn available_commands() -> String {
    format!("Available commands: {}", COMMANDS.join(", "))
}

/// A parsed command line: the command name and its argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Tokenizes a line. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = tokenize(line).into_iter();
        let name = tokens.next()?;
        Some(Self {
            name,
            args: tokens.collect(),
        })
    }
}

/// Executes commands against a store handle.
///
/// The store is passed in explicitly, so the same handler runs against the
/// on-disk engine or an in-memory double.
#[derive(Clone)]
pub struct CommandHandler {
    /// The store handle, shared by every command
    storage: Arc<dyn KvStore>,
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler").finish_non_exhaustive()
    }
}

impl CommandHandler {
    /// Creates a new command handler with the given store.
    pub fn new(storage: Arc<dyn KvStore>) -> Self {
        Self { storage }
    }

    /// Tokenizes and executes one raw line.
    ///
    /// `stdin` is only read by `restore` without a file argument.
    pub async fn execute_line(
        &self,
        line: &str,
        stdin: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Reply {
        match Invocation::parse(line) {
            Some(invocation) => self.execute(invocation, stdin).await,
            None => Reply::Empty,
        }
    }

    /// Executes a parsed invocation and returns the reply.
    pub async fn execute(
        &self,
        invocation: Invocation,
        stdin: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Reply {
        debug!(command = %invocation.name, args = invocation.args.len(), "Dispatching");
        self.dispatch(&invocation.name, &invocation.args, stdin).await
    }

    /// Dispatches a command to its handler.
    async fn dispatch(
        &self,
        cmd: &str,
        args: &[String],
        stdin: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Reply {
        match cmd {
            "list" => self.cmd_list(args).await,
            "add" => self.cmd_add(args).await,
            "get" => self.cmd_get(args).await,
            "delete" => self.cmd_delete(args).await,
            "dump" => self.cmd_dump(args).await,
            "restore" => self.cmd_restore(args, stdin).await,
            "clear" => self.cmd_clear(args).await,
            "exit" => Reply::Exit(GOODBYE.to_string()),

            // Unknown command
            _ => Reply::text(available_commands()),
        }
    }

    // ========================================================================
    // Helper functions
    // ========================================================================

    fn store(&self) -> &dyn KvStore {
        self.storage.as_ref()
    }

    /// Logs a store failure and turns it into an error reply.
    fn store_failure(&self, cmd: &str, e: StoreError) -> Reply {
        error!(command = cmd, error = %e, "Store operation failed");
        Reply::error(format!("Store error: {}", e))
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// list [part ...]
    async fn cmd_list(&self, args: &[String]) -> Reply {
        let prefix = codec::prefix_key(args);
        let mut replies = vec![Reply::text(format!(
            "Listing items with prefix: {}",
            prefix_label(&prefix)
        ))];

        let mut scan = list_by_prefix(self.store(), prefix);
        loop {
            match scan.next().await {
                Ok(Some(entry)) => {
                    replies.push(Reply::text(format!("{} {}", entry.key.to_json(), entry.value)))
                }
                Ok(None) => break,
                Err(e) => {
                    replies.push(self.store_failure("list", e));
                    break;
                }
            }
        }

        Reply::batch(replies)
    }

    // ========================================================================
    // Point Commands
    // ========================================================================

    /// add part [part ...] <JSON>
    async fn cmd_add(&self, args: &[String]) -> Reply {
        let (key, value) = match codec::decode_add(args) {
            Ok(decoded) => decoded,
            Err(CodecError::InvalidJson(reason)) => {
                debug!(reason = %reason, "Rejected add payload");
                return Reply::error(INVALID_JSON);
            }
            Err(_) => return Reply::error(USAGE_ADD),
        };

        let message = format!("Added: {} -> {}", key, value);
        match self.store().set(key, value).await {
            Ok(()) => Reply::text(message),
            Err(e) => self.store_failure("add", e),
        }
    }

    /// get part [part ...]
    async fn cmd_get(&self, args: &[String]) -> Reply {
        let key = match codec::point_key(args) {
            Ok(key) => key,
            Err(_) => return Reply::error(USAGE_GET),
        };

        match self.store().get(&key).await {
            Ok(Some(entry)) => Reply::text(format!("Value for key {}: {}", key, entry.value)),
            Ok(None) => Reply::text(format!("Key not found: {}", key)),
            Err(e) => self.store_failure("get", e),
        }
    }

    /// delete part [part ...]
    async fn cmd_delete(&self, args: &[String]) -> Reply {
        let key = match codec::point_key(args) {
            Ok(key) => key,
            Err(_) => return Reply::error(USAGE_DELETE),
        };

        match self.store().delete(&key).await {
            Ok(()) => Reply::text(format!("Deleted: {}", key)),
            Err(e) => self.store_failure("delete", e),
        }
    }

    // ========================================================================
    // Bulk Commands
    // ========================================================================

    /// dump [part ...]
    async fn cmd_dump(&self, args: &[String]) -> Reply {
        let prefix = codec::prefix_key(args);
        match serialization::dump(self.store(), prefix).await {
            Ok(json) => Reply::text(json),
            Err(e) => {
                error!(error = %e, "Dump failed");
                Reply::error(format!("Failed to dump KV contents: {}", e))
            }
        }
    }

    /// restore [file]
    async fn cmd_restore(&self, args: &[String], stdin: &mut (dyn AsyncRead + Unpin + Send)) -> Reply {
        let source = match args {
            [] => RestoreSource::Stdin(stdin),
            [path] => RestoreSource::File(PathBuf::from(path)),
            _ => return Reply::error(USAGE_RESTORE),
        };

        let (stats, reply) = serialization::restore(self.store(), source).await;
        debug!(
            applied = stats.applied,
            invalid = stats.invalid,
            failed = stats.failed,
            "Restore finished"
        );
        reply
    }

    /// clear [part ...]
    async fn cmd_clear(&self, args: &[String]) -> Reply {
        let prefix = codec::prefix_key(args);
        let (cleared, reply) = serialization::clear(self.store(), prefix).await;
        debug!(cleared, "Clear finished");
        reply
    }
}
