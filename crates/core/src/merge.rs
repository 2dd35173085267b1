//! JSON merge strategies.
//!
//! All strategies are pure and deterministic: they consume two parsed JSON
//! values and return the merged value. Object key order follows insertion
//! order (first input's keys, then keys only the second input has).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// How two JSON documents are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Union of top-level keys, second input wins on conflicts. Objects only.
    Shallow,
    /// Recursive: objects merge, arrays concatenate, anything else is replaced.
    Deep,
    /// The second input, verbatim.
    Override,
    /// `{"file1": first, "file2": second}`.
    Combine,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shallow => "shallow",
            Self::Deep => "deep",
            Self::Override => "override",
            Self::Combine => "combine",
        }
    }

    /// Apply this strategy to two parsed documents.
    pub fn apply(&self, first: Value, second: Value) -> Result<Value> {
        match self {
            Self::Shallow => shallow_merge(first, second),
            Self::Deep => Ok(deep_merge(first, second)),
            Self::Override => Ok(second),
            Self::Combine => Ok(combine(first, second)),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "shallow" => Ok(Self::Shallow),
            "deep" => Ok(Self::Deep),
            "override" => Ok(Self::Override),
            "combine" => Ok(Self::Combine),
            _ => Err(Error::InvalidStrategy(s.to_string())),
        }
    }
}

/// Top-level key union; the second object's values win.
pub fn shallow_merge(first: Value, second: Value) -> Result<Value> {
    match (first, second) {
        (Value::Object(mut first), Value::Object(second)) => {
            for (key, value) in second {
                first.insert(key, value);
            }
            Ok(Value::Object(first))
        }
        (first, second) => Err(Error::IncompatibleShape(format!(
            "shallow merge requires two JSON objects, got {} and {}",
            kind(&first),
            kind(&second)
        ))),
    }
}

/// Structural recursion over both values.
pub fn deep_merge(first: Value, second: Value) -> Value {
    match (first, second) {
        (Value::Object(first), Value::Object(second)) => Value::Object(deep_merge_maps(first, second)),
        (Value::Array(mut first), Value::Array(second)) => {
            first.extend(second);
            Value::Array(first)
        }
        (_, second) => second,
    }
}

fn deep_merge_maps(mut first: Map<String, Value>, second: Map<String, Value>) -> Map<String, Value> {
    // Merge in place so existing keys keep their position.
    for (key, incoming) in second {
        match first.get_mut(&key) {
            Some(existing) => {
                let current = existing.take();
                *existing = deep_merge(current, incoming);
            }
            None => {
                first.insert(key, incoming);
            }
        }
    }
    first
}

/// Wrap both inputs side by side.
pub fn combine(first: Value, second: Value) -> Value {
    let mut wrapper = Map::with_capacity(2);
    wrapper.insert("file1".to_string(), first);
    wrapper.insert("file2".to_string(), second);
    Value::Object(wrapper)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
