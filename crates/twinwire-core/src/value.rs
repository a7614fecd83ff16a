//! JSON value tree with structural pointers
//!
//! Signals serialize into plain `serde_json` values. This module adds the
//! validated keys and pointers used to address sub-trees of an entity's
//! representation. All operations are copy-on-write: the input document is
//! never mutated.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use serde_json::Value;

/// JSON object as carried in signal payloads
pub type JsonObject = serde_json::Map<String, Value>;

const SEPARATOR: char = '/';

/// A single structural key: an object key or one pointer segment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JsonKey(String);

impl JsonKey {
    /// Validate a key: non-empty, printable, no path separator
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self(key))
    }

    /// Key from a literal known to be valid, for fixed layout keys.
    ///
    /// # Panics
    /// If `key` breaks the key rules.
    pub fn from_static(key: &'static str) -> Self {
        match validate_key(key) {
            Ok(()) => Self(key.to_string()),
            Err(e) => panic!("invalid static key: {e}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check the lexical rules every structural key must satisfy
pub fn validate_key(key: &str) -> Result<(), ValidationError> {
    let reason = if key.is_empty() {
        Some("must not be empty")
    } else if key.contains(SEPARATOR) {
        Some("must not contain '/'")
    } else if key.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ValidationError::InvalidKey {
            key: key.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

impl fmt::Display for JsonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JsonKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JsonKey> for String {
    fn from(key: JsonKey) -> Self {
        key.0
    }
}

impl FromStr for JsonKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Pointer into a JSON document, e.g. `/features/lamp/properties/on`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JsonPointer(Vec<JsonKey>);

impl JsonPointer {
    /// The document root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a pointer. `""` and `"/"` denote the root; a leading slash is optional.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let body = input.strip_prefix(SEPARATOR).unwrap_or(input);
        if body.is_empty() {
            return Ok(Self::root());
        }
        body.split(SEPARATOR)
            .map(|segment| {
                if segment.is_empty() {
                    Err(ValidationError::InvalidPointer {
                        pointer: input.to_string(),
                        reason: "contains an empty segment".to_string(),
                    })
                } else {
                    JsonKey::new(segment)
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject the root pointer where a sub-resource is required
    pub fn require_non_empty(self, context: &'static str) -> Result<Self, ValidationError> {
        if self.is_root() {
            Err(ValidationError::EmptyPointer { context })
        } else {
            Ok(self)
        }
    }

    pub fn keys(&self) -> &[JsonKey] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&JsonKey> {
        self.0.last()
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, rest)| Self(rest.to_vec()))
    }

    #[must_use]
    pub fn append(&self, key: JsonKey) -> Self {
        let mut keys = self.0.clone();
        keys.push(key);
        Self(keys)
    }

    #[must_use]
    pub fn concat(&self, other: &JsonPointer) -> Self {
        let mut keys = self.0.clone();
        keys.extend(other.0.iter().cloned());
        Self(keys)
    }

    /// True when `self` addresses `other` or one of its ancestors
    pub fn is_prefix_of(&self, other: &JsonPointer) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Look up the addressed sub-tree
    pub fn get<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .try_fold(document, |node, key| node.as_object()?.get(key.as_str()))
    }

    /// New document with `value` placed at this pointer; missing or
    /// non-object intermediate nodes become objects
    pub fn set(&self, document: &Value, value: Value) -> Value {
        let mut result = document.clone();
        let Some((last, parents)) = self.0.split_last() else {
            return value;
        };
        let mut node = &mut result;
        for key in parents {
            node = ensure_object(node)
                .entry(key.as_str())
                .or_insert_with(|| Value::Object(JsonObject::new()));
        }
        ensure_object(node).insert(last.as_str().to_string(), value);
        result
    }

    /// New document without the addressed key; the root removes to `null`
    pub fn remove(&self, document: &Value) -> Value {
        let Some((last, parents)) = self.0.split_last() else {
            return Value::Null;
        };
        let mut result = document.clone();
        let parent = parents.iter().try_fold(&mut result, |node, key| {
            node.as_object_mut()?.get_mut(key.as_str())
        });
        if let Some(Value::Object(map)) = parent {
            map.remove(last.as_str());
        }
        result
    }

    /// Nest `value` in objects along this pointer, so that
    /// `wrap(v).get(self) == v`
    pub fn wrap(&self, value: Value) -> Value {
        self.0.iter().rev().fold(value, |inner, key| {
            let mut map = JsonObject::new();
            map.insert(key.as_str().to_string(), inner);
            Value::Object(map)
        })
    }
}

fn ensure_object(node: &mut Value) -> &mut JsonObject {
    if !node.is_object() {
        *node = Value::Object(JsonObject::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for key in &self.0 {
            write!(f, "/{key}")?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for JsonPointer {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JsonPointer> for String {
    fn from(pointer: JsonPointer) -> Self {
        pointer.to_string()
    }
}

impl From<JsonKey> for JsonPointer {
    fn from(key: JsonKey) -> Self {
        Self(vec![key])
    }
}

/// Validate every object key in a value tree, recursively
pub fn validate_keys(value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::Object(map) => map.iter().try_for_each(|(key, inner)| {
            validate_key(key)?;
            validate_keys(inner)
        }),
        Value::Array(items) => items.iter().try_for_each(validate_keys),
        _ => Ok(()),
    }
}
