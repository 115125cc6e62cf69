//! Tolerant parsing of tool output.
//!
//! Cloud CLIs occasionally print diagnostics instead of JSON. Output is first
//! parsed into a [`Value`] (falling back to a `{"raw": ...}` wrapper), then
//! decoded into a permissive typed shape at the call site.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const RAW_KEY: &str = "raw";

/// Parse `text` as JSON, or wrap it verbatim as `{"raw": text}`.
pub fn parse_json_or_raw(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            let mut wrapper = Map::new();
            wrapper.insert(RAW_KEY.to_string(), Value::String(text.to_string()));
            Value::Object(wrapper)
        }
    }
}

/// Return the wrapped text if `value` is a raw wrapper produced by [`parse_json_or_raw`].
pub fn raw_text(value: &Value) -> Option<&str> {
    let object = value.as_object()?;
    if object.len() != 1 {
        return None;
    }
    object.get(RAW_KEY)?.as_str()
}

/// A tool response that did not match the expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    pub shape: &'static str,
    pub message: String,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.shape, self.message)
    }
}

impl std::error::Error for ShapeError {}

/// Decode a parsed response into the typed shape `T`.
///
/// Raw wrappers are rejected up front: permissive shapes would otherwise
/// decode them into all-default values and hide the drift.
pub fn decode_shape<T: DeserializeOwned>(value: &Value) -> Result<T, ShapeError> {
    let shape = short_type_name::<T>();
    if raw_text(value).is_some() {
        return Err(ShapeError {
            shape,
            message: "response was not JSON".to_string(),
        });
    }
    serde_json::from_value(value.clone()).map_err(|err| ShapeError {
        shape,
        message: err.to_string(),
    })
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
