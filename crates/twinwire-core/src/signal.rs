//! Envelope capabilities shared by every command, response and event
//!
//! Concrete variants are plain immutable structs. The capabilities here are
//! implemented per variant only where the variant genuinely has the data: an
//! event without a revision simply does not implement [`WithRevision`].

use crate::entity::EntityId;
use crate::headers::Headers;
use crate::status::HttpStatus;
use crate::value::{JsonKey, JsonPointer, Value};
use chrono::{DateTime, Utc};
use std::fmt;

/// Closed set of signal families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalCategory {
    Command,
    CommandResponse,
    Event,
}

impl fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::CommandResponse => write!(f, "response"),
            Self::Event => write!(f, "event"),
        }
    }
}

/// The envelope every signal exposes
pub trait Signal {
    /// Stable `<prefix>.<name>` wire tag of the concrete variant
    fn type_tag(&self) -> &'static str;

    fn category(&self) -> SignalCategory;

    fn entity_id(&self) -> &EntityId;

    /// Sub-resource of the entity this signal acts on
    fn resource_path(&self) -> JsonPointer;

    fn headers(&self) -> &Headers;

    /// Same signal with the headers replaced; no other field changes
    #[must_use]
    fn with_headers(&self, headers: Headers) -> Self
    where
        Self: Sized;

    /// Payload value carried by the signal, if any
    fn payload(&self) -> Option<Value> {
        None
    }
}

/// Responses carrying a validated status
pub trait CommandResponse: Signal {
    fn http_status(&self) -> HttpStatus;
}

/// Events that carry the entity revision they produced
pub trait WithRevision: Signal {
    fn revision(&self) -> u64;

    #[must_use]
    fn with_revision(&self, revision: u64) -> Self
    where
        Self: Sized;
}

/// Events that may carry the time they happened
pub trait WithTimestamp: Signal {
    fn timestamp(&self) -> Option<DateTime<Utc>>;
}

/// Signals addressing a single feature of a thing
pub trait WithFeatureId: Signal {
    fn feature_id(&self) -> &JsonKey;
}

/// Split a type tag into `(prefix, name)` at its last dot
pub fn split_type_tag(tag: &str) -> Option<(&str, &str)> {
    tag.rsplit_once('.')
        .filter(|(prefix, name)| !prefix.is_empty() && !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_type_tag() {
        assert_eq!(
            split_type_tag("things.commands.modifyAttribute"),
            Some(("things.commands", "modifyAttribute"))
        );
        assert_eq!(split_type_tag("nodot"), None);
        assert_eq!(split_type_tag("trailing."), None);
        assert_eq!(split_type_tag(".leading"), None);
    }
}
