//! The JSON codec capability.
//!
//! A [`JsonCodec`] owns the boundary between bytes and JSON trees: parsing
//! request body strings and response bodies, and rendering request bodies for
//! the wire. Typed values move in and out of trees through serde with
//! [`to_tree`], [`from_tree`] and [`array_from_tree`].

use core::fmt;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Converts between raw bytes and JSON trees.
pub trait JsonCodec: Send + Sync + fmt::Debug {
    /// Parses `bytes` as one JSON document.
    fn decode_tree(&self, bytes: &[u8]) -> Result<Value, serde_json::Error>;

    /// Renders `tree` as bytes.
    fn encode_tree(&self, tree: &Value) -> Result<Vec<u8>, serde_json::Error>;
}

/// The default codec, backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeJsonCodec;

impl JsonCodec for SerdeJsonCodec {
    fn decode_tree(&self, bytes: &[u8]) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    fn encode_tree(&self, tree: &Value) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(tree)
    }
}

/// Serializes any value into a JSON tree.
pub fn to_tree<T: Serialize + ?Sized>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value)
}

/// Deserializes a JSON tree into `T`.
pub fn from_tree<T: DeserializeOwned>(tree: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(tree)
}

/// Deserializes a JSON array into a list of `T`; `null` yields an empty list.
pub fn array_from_tree<T: DeserializeOwned>(tree: &Value) -> Result<Vec<T>, serde_json::Error> {
    match tree {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => Vec::<T>::deserialize(tree),
        other => Err(serde::de::Error::custom(format!(
            "expecting a JSON array, found: {}",
            other
        ))),
    }
}

/// Whether a `Content-Type` value names a JSON media type.
pub fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
