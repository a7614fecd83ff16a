//! Validated identifiers of the entities signals concern

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_ID_LENGTH: usize = 256;

/// Kind of entity an identifier addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Thing,
    Connection,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thing => write!(f, "thing"),
            Self::Connection => write!(f, "connection"),
        }
    }
}

/// Immutable `namespace:name` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    entity_type: EntityType,
    namespace: String,
    name: String,
}

impl EntityId {
    /// Parse a thing id such as `org.example:lamp-1`
    pub fn thing(id: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidEntityId {
            id: id.to_string(),
            reason: reason.to_string(),
        };
        if id.len() > MAX_ID_LENGTH {
            return Err(invalid("exceeds 256 characters"));
        }
        let (namespace, name) = id
            .split_once(':')
            .ok_or_else(|| invalid("expected '<namespace>:<name>'"))?;
        if !is_valid_namespace(namespace) {
            return Err(invalid(
                "namespace must be dot-separated segments starting with a letter",
            ));
        }
        if name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if name.chars().any(|c| c == '/' || c.is_control()) {
            return Err(invalid("name must not contain '/' or control characters"));
        }
        Ok(Self {
            entity_type: EntityType::Thing,
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    /// Parse a connection id; connections have no namespace
    pub fn connection(id: &str) -> Result<Self, ValidationError> {
        let valid = !id.is_empty()
            && id.len() <= MAX_ID_LENGTH
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
        if !valid {
            return Err(ValidationError::InvalidEntityId {
                id: id.to_string(),
                reason: "connection ids are 1-256 characters of [A-Za-z0-9_:-]".to_string(),
            });
        }
        Ok(Self {
            entity_type: EntityType::Connection,
            namespace: String::new(),
            name: id.to_string(),
        })
    }

    /// Parse an id of the given type
    pub fn parse(entity_type: EntityType, id: &str) -> Result<Self, ValidationError> {
        match entity_type {
            EntityType::Thing => Self::thing(id),
            EntityType::Connection => Self::connection(id),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// Empty, or segments like `org.example` where each starts with a letter.
fn is_valid_namespace(namespace: &str) -> bool {
    namespace.is_empty()
        || namespace.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entity_type {
            EntityType::Thing => write!(f, "{}:{}", self.namespace, self.name),
            EntityType::Connection => f.write_str(&self.name),
        }
    }
}

impl Serialize for EntityId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
