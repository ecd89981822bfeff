// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dotted-path accessor over dynamic JSON payloads.
//!
//! A [`Path`] is parsed from `$`-rooted dotted text (`$.a.b`). `$` alone is
//! the root path. Paths support lookup, kind-asserting lookup, and
//! set-with-autovivification, all over `serde_json::Value`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from parsing or applying a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Not Found")]
    NotFound,
    #[error("bad path {text:?}: {reason}")]
    Parse { text: String, reason: &'static str },
    #[error("path {path} must resolve to {expected}")]
    Kind { path: String, expected: &'static str },
    #[error("path {path} timestamp invalid: {cause}")]
    Timestamp { path: String, cause: String },
    #[error("cannot set non-map value at root path $")]
    RootValue,
}

/// An ordered list of map-key segments. The empty list is the root (`$`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The root path `$`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path from its `$`-rooted textual form.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if !text.starts_with('$') {
            return Err(PathError::Parse {
                text: text.to_string(),
                reason: "must start with $",
            });
        }

        if text == "$" {
            return Ok(Self::root());
        }

        let Some(rest) = text.strip_prefix("$.") else {
            return Err(PathError::Parse {
                text: text.to_string(),
                reason: "must start with $.",
            });
        };

        let segments: Vec<String> = rest.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::Parse {
                text: text.to_string(),
                reason: "has empty segment",
            });
        }

        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve the path against a value.
    ///
    /// Missing keys, non-map intermediates, and null intermediates are all
    /// [`PathError::NotFound`]. The root path resolves to the input itself.
    pub fn get<'a>(&self, value: &'a Value) -> Result<&'a Value, PathError> {
        let mut current = value;
        for segment in &self.segments {
            match current {
                Value::Object(map) => {
                    current = map.get(segment).ok_or(PathError::NotFound)?;
                }
                _ => return Err(PathError::NotFound),
            }
        }
        Ok(current)
    }

    /// Resolve to a string.
    pub fn get_string<'a>(&self, value: &'a Value) -> Result<&'a str, PathError> {
        match self.get(value)? {
            Value::String(s) => Ok(s),
            _ => Err(self.kind_error("a string")),
        }
    }

    /// Resolve to a number (any JSON number widens to f64).
    pub fn get_number(&self, value: &Value) -> Result<f64, PathError> {
        match self.get(value)? {
            Value::Number(n) => n.as_f64().ok_or_else(|| self.kind_error("a number")),
            _ => Err(self.kind_error("a number")),
        }
    }

    /// Resolve to a boolean.
    pub fn get_bool(&self, value: &Value) -> Result<bool, PathError> {
        match self.get(value)? {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.kind_error("a boolean")),
        }
    }

    /// Resolve to an RFC 3339 timestamp.
    pub fn get_time(&self, value: &Value) -> Result<DateTime<Utc>, PathError> {
        let text = match self.get(value)? {
            Value::String(s) => s,
            _ => return Err(self.kind_error("a timestamp string")),
        };

        DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| PathError::Timestamp {
                path: self.to_string(),
                cause: e.to_string(),
            })
    }

    /// Resolve to a map.
    pub fn get_map<'a>(&self, value: &'a Value) -> Result<&'a Map<String, Value>, PathError> {
        match self.get(value)? {
            Value::Object(map) => Ok(map),
            _ => Err(self.kind_error("a map")),
        }
    }

    /// Resolve to a sequence.
    pub fn get_slice<'a>(&self, value: &'a Value) -> Result<&'a Vec<Value>, PathError> {
        match self.get(value)? {
            Value::Array(items) => Ok(items),
            _ => Err(self.kind_error("a sequence")),
        }
    }

    /// Write `value` into `root` at this path, returning the resulting map.
    ///
    /// Intermediate maps are created as needed; non-map intermediates are
    /// overwritten. Setting at the root requires `value` to be a map.
    pub fn set(&self, root: Value, value: Value) -> Result<Map<String, Value>, PathError> {
        if self.segments.is_empty() {
            return match value {
                Value::Object(map) => Ok(map),
                _ => Err(PathError::RootValue),
            };
        }
        Ok(set_into(root, value, &self.segments))
    }

    fn kind_error(&self, expected: &'static str) -> PathError {
        PathError::Kind {
            path: self.to_string(),
            expected,
        }
    }
}

fn set_into(data: Value, value: Value, segments: &[String]) -> Map<String, Value> {
    let mut map = match data {
        Value::Object(map) => map,
        // Overwrite any non-map (including null) with a fresh map
        _ => Map::new(),
    };

    if let [segment] = segments {
        map.insert(segment.clone(), value);
    } else {
        let child = map.remove(&segments[0]).unwrap_or(Value::Null);
        let nested = set_into(child, value, &segments[1..]);
        map.insert(segments[0].clone(), Value::Object(nested));
    }

    map
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            f.write_str("$")
        } else {
            write!(f, "$.{}", self.segments.join("."))
        }
    }
}

impl std::str::FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
