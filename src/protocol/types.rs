//! Composite Key Data Types
//!
//! This module defines the data types stored in and read back from the
//! ordered key-value store.
//!
//! ## Key Layout
//!
//! A key is an ordered sequence of parts. Each part is one of four types:
//! - raw bytes
//! - text
//! - 64-bit signed integer
//! - boolean
//!
//! Keys compare part by part. Parts of different types compare by type tag
//! first, in the order listed above, so `[b"x"] < ["x"] < [1] < [true]`.
//! Because comparison is lexicographic, every key that starts with a given
//! prefix sorts contiguously directly after that prefix.
//!
//! ## JSON Form
//!
//! | Part    | JSON                  |
//! |---------|-----------------------|
//! | Text    | `"users"`             |
//! | Integer | `42`                  |
//! | Boolean | `true`                |
//! | Bytes   | `{"bytes": [1, 2, 3]}`|
//!
//! An [`Entry`] serializes as `{"key": [...], "value": ...}`, which is the
//! element type of the dump/restore interchange array.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One atomic component of a composite key.
///
/// Variant order is significant: the derived `Ord` sorts by variant first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    /// Raw bytes, written in JSON as `{"bytes": [..]}`
    Bytes { bytes: Bytes },

    /// UTF-8 text
    Text(String),

    /// 64-bit signed integer
    Integer(i64),

    /// Boolean flag
    Boolean(bool),
}

impl KeyPart {
    /// Creates a text key part.
    ///
    /// # Example
    /// ```
    /// use kvadmin::protocol::types::KeyPart;
    /// let part = KeyPart::text("users");
    /// assert_eq!(part.to_string(), "users");
    /// ```
    pub fn text(s: impl Into<String>) -> Self {
        KeyPart::Text(s.into())
    }

    /// Creates an integer key part.
    pub fn integer(n: i64) -> Self {
        KeyPart::Integer(n)
    }

    /// Creates a boolean key part.
    pub fn boolean(b: bool) -> Self {
        KeyPart::Boolean(b)
    }

    /// Creates a raw-bytes key part.
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        KeyPart::Bytes { bytes: data.into() }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Text(s) => write!(f, "{}", s),
            KeyPart::Integer(n) => write!(f, "{}", n),
            KeyPart::Boolean(b) => write!(f, "{}", b),
            KeyPart::Bytes { bytes } => {
                write!(f, "0x")?;
                for byte in bytes.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::text(s)
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Text(s)
    }
}

impl From<i64> for KeyPart {
    fn from(n: i64) -> Self {
        KeyPart::Integer(n)
    }
}

impl From<bool> for KeyPart {
    fn from(b: bool) -> Self {
        KeyPart::Boolean(b)
    }
}

/// A composite key: an ordered sequence of key parts.
///
/// Point operations require a non-empty key. Prefix operations accept an
/// empty key, which matches every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(Vec<KeyPart>);

impl Key {
    /// Creates a key from its parts.
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    /// The empty key (matches everything as a prefix).
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `prefix` is a leading run of this key's parts.
    ///
    /// A key is considered to start with itself.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Renders the key as compact JSON, e.g. `["users",1]`.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }

    pub fn into_parts(self) -> Vec<KeyPart> {
        self.0
    }
}

impl fmt::Display for Key {
    /// Joins the parts with `", "`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl From<Vec<KeyPart>> for Key {
    fn from(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }
}

impl<'a> FromIterator<&'a str> for Key {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(KeyPart::from).collect())
    }
}

impl FromIterator<KeyPart> for Key {
    fn from_iter<I: IntoIterator<Item = KeyPart>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An immutable (key, value) pair as returned by store reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub key: Key,
    pub value: Value,
}

impl Entry {
    pub fn new(key: Key, value: Value) -> Self {
        Self { key, value }
    }
}
