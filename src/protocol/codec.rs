//! Key Codec
//!
//! Maps command argument tokens onto composite keys.
//!
//! - `get`, `delete`: every token is one key part; at least one is required.
//! - `list`, `dump`, `clear`: every token is one key part of a prefix; zero
//!   tokens is the empty prefix (the whole store).
//! - `add`: the last token is a JSON payload, every preceding token is a key
//!   part.
//!
//! Tokens typed at the prompt always become text parts.

use crate::protocol::types::{Key, KeyPart};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while decoding command arguments.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// A point operation was given no key parts
    #[error("key requires at least one part")]
    EmptyKey,

    /// `add` was given no JSON payload token
    #[error("missing JSON payload")]
    MissingPayload,

    /// The payload token is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

/// Builds a point key (get/delete). Rejects an empty argument list.
pub fn point_key(args: &[String]) -> Result<Key, CodecError> {
    if args.is_empty() {
        return Err(CodecError::EmptyKey);
    }
    Ok(prefix_key(args))
}

/// Builds a prefix key (list/dump/clear). Never fails.
pub fn prefix_key(args: &[String]) -> Key {
    args.iter().map(|arg| KeyPart::text(arg.as_str())).collect()
}

/// Splits `add` arguments into the key tokens and the raw payload token.
pub fn split_payload(args: &[String]) -> Result<(Key, &str), CodecError> {
    let (payload, key_args) = match args.split_last() {
        Some((payload, rest)) => (payload, rest),
        None => return Err(CodecError::MissingPayload),
    };

    if key_args.is_empty() {
        return Err(CodecError::EmptyKey);
    }

    if payload.is_empty() {
        return Err(CodecError::MissingPayload);
    }

    Ok((prefix_key(key_args), payload.as_str()))
}

/// Parses a JSON payload into a value.
pub fn parse_value(raw: &str) -> Result<Value, CodecError> {
    serde_json::from_str(raw).map_err(|e| CodecError::InvalidJson(e.to_string()))
}

/// Decodes the full `add` argument list into the key and parsed value.
pub fn decode_add(args: &[String]) -> Result<(Key, Value), CodecError> {
    let (key, raw) = split_payload(args)?;
    let value = parse_value(raw)?;
    Ok((key, value))
}
