//! Command Line Protocol
//!
//! This module turns raw operator input into store-level values.
//!
//! ## Overview
//!
//! A command line is split into tokens, the first token names the command,
//! and the remaining tokens are decoded into a composite key (and, for `add`,
//! a JSON value).
//!
//! ## Modules
//!
//! - `tokenizer`: Two-state quote-aware line splitter
//! - `types`: `KeyPart`, `Key` and `Entry`
//! - `codec`: Argument tokens to keys and payloads
//!
//! ## Example
//!
//! ```
//! use kvadmin::protocol::{codec, tokenize};
//!
//! let tokens = tokenize(r#"add users "Ada L" {"admin":true}"#);
//! let (key, value) = codec::decode_add(&tokens[1..]).unwrap();
//! assert_eq!(key.to_string(), "users, Ada L");
//! assert_eq!(value["admin"], true);
//! ```

pub mod codec;
pub mod tokenizer;
pub mod types;

// Re-export commonly used types for convenience
pub use codec::CodecError;
pub use tokenizer::{join_tokens, tokenize, Tokenizer};
pub use types::{Entry, Key, KeyPart};
