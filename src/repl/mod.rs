//! REPL Module
//!
//! This module runs commands either interactively or once.
//!
//! ## Modes
//!
//! ```text
//!   no arguments                      arguments
//!        │                                │
//!        ▼                                ▼
//! ┌──────────────┐               ┌──────────────────┐
//! │ ReplSession  │               │ run_once()       │
//! │ prompt/read  │               │ joined args as   │
//! │ until exit   │               │ a single line    │
//! └──────┬───────┘               └────────┬─────────┘
//!        │                                │
//!        └──────────────┬─────────────────┘
//!                       ▼
//!              CommandHandler::execute_line
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use kvadmin::commands::CommandHandler;
//! use kvadmin::repl::ReplSession;
//! use kvadmin::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::io::{stderr, stdin, stdout, BufReader};
//!
//! let handler = CommandHandler::new(Arc::new(StorageEngine::open("kvadmin.json").await?));
//! let mut session = ReplSession::new(BufReader::new(stdin()), stdout(), stderr(), handler);
//! session.run().await?;
//! ```

pub mod session;

// Re-export commonly used types
pub use session::{
    run_once, write_reply, ReplSession, SessionError, SessionState, SessionStats, DEFAULT_PROMPT,
    WELCOME,
};
