//! Command Handler Module
//!
//! This module implements the command processing layer for kvadmin.
//! It receives raw command lines, executes them against the store, and
//! returns replies for the session loop to print.
//!
//! ## Architecture
//!
//! ```text
//! Operator input
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Tokenizer      │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  dyn KvStore    │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Commands
//!
//! - Point: `get`, `add`, `delete`
//! - Prefix: `list`, `dump`, `clear`
//! - Bulk load: `restore`
//! - Session: `exit`

pub mod handler;
pub mod reply;
pub mod serialization;

// Re-export the main command handler
pub use handler::{available_commands, CommandHandler, Invocation, COMMANDS};
pub use reply::{Channel, Reply};
pub use serialization::{RestoreSource, RestoreStats};
