//! Type registry and dispatcher
//!
//! Maps a wire `type` tag to the function that reconstructs the concrete
//! variant. A registry is built once from an explicit table and is read-only
//! afterwards, so it can be shared freely across threads.

use crate::codec::{decoding_version, fields};
use crate::error::{DecodeError, RegistryError, SignalError};
use crate::headers::Headers;
use crate::signal::split_type_tag;
use crate::value::{JsonObject, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

/// Decoder of one concrete variant
pub type DecodeFn<S> = fn(&JsonObject, &Headers) -> Result<S, SignalError>;

/// Immutable snapshot of type tag to decoder
pub struct Registry<S> {
    decoders: HashMap<&'static str, DecodeFn<S>>,
}

impl<S> Registry<S> {
    /// Build from a registration table; duplicate or malformed tags fail
    pub fn build<I>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (&'static str, DecodeFn<S>)>,
    {
        let mut decoders = HashMap::new();
        for (type_tag, decoder) in entries {
            if split_type_tag(type_tag).is_none() {
                return Err(RegistryError::MalformedType(type_tag.to_string()));
            }
            if decoders.insert(type_tag, decoder).is_some() {
                return Err(RegistryError::DuplicateType(type_tag.to_string()));
            }
        }
        Ok(Self { decoders })
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.decoders.contains_key(type_tag)
    }

    /// Registered tags in sorted order
    pub fn type_tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.decoders.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    /// Dispatch on the object's `type` field. Unknown tags fail closed;
    /// decoder errors are returned unchanged.
    pub fn decode(&self, object: &JsonObject, headers: &Headers) -> Result<S, SignalError> {
        let type_tag = match object.get(fields::TYPE.name) {
            Some(Value::String(tag)) => tag.as_str(),
            Some(other) => {
                return Err(DecodeError::WrongShape {
                    field: fields::TYPE.name,
                    detail: format!("expected a string, found {other}"),
                }
                .into())
            }
            None => {
                return Err(DecodeError::MissingField {
                    field: fields::TYPE.name,
                    version: decoding_version(headers)?,
                }
                .into())
            }
        };
        let Some(decoder) = self.decoders.get(type_tag) else {
            warn!(type_tag, "no decoder registered for signal type");
            return Err(SignalError::UnknownType {
                type_tag: type_tag.to_string(),
            });
        };
        let signal = decoder(object, headers)?;
        debug!(type_tag, correlation_id = headers.correlation_id(), "decoded signal");
        Ok(signal)
    }

    pub fn decode_value(&self, value: &Value, headers: &Headers) -> Result<S, SignalError> {
        match value {
            Value::Object(object) => self.decode(object, headers),
            _ => Err(DecodeError::NotAnObject.into()),
        }
    }

    pub fn decode_str(&self, json: &str, headers: &Headers) -> Result<S, SignalError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        self.decode_value(&value, headers)
    }
}

impl<S> fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.type_tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    enum Sample {
        Ping(String),
        Pong,
    }

    fn decode_ping(object: &JsonObject, _headers: &Headers) -> Result<Sample, SignalError> {
        let reader = crate::codec::JsonReader::new(object, crate::version::SchemaVersion::V2);
        Ok(Sample::Ping(
            reader.str(&crate::field::FieldDefinition::regular("word"))?.to_string(),
        ))
    }

    fn decode_pong(_object: &JsonObject, _headers: &Headers) -> Result<Sample, SignalError> {
        Ok(Sample::Pong)
    }

    fn registry() -> Registry<Sample> {
        Registry::build([
            ("test.samples.ping", decode_ping as DecodeFn<Sample>),
            ("test.samples.pong", decode_pong as DecodeFn<Sample>),
        ])
        .unwrap()
    }

    fn obj(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_dispatch() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.type_tags(), vec!["test.samples.ping", "test.samples.pong"]);
        let headers = Headers::new();
        assert_eq!(
            registry.decode(&obj(json!({"type": "test.samples.ping", "word": "hi"})), &headers),
            Ok(Sample::Ping("hi".to_string()))
        );
        assert_eq!(
            registry.decode_str(r#"{"type":"test.samples.pong"}"#, &headers),
            Ok(Sample::Pong)
        );
    }

    #[test]
    fn test_unknown_type_fails_closed() {
        let err = registry()
            .decode(&obj(json!({"type": "does.not.exist"})), &Headers::new())
            .unwrap_err();
        assert_eq!(
            err,
            SignalError::UnknownType {
                type_tag: "does.not.exist".to_string()
            }
        );
    }

    #[test]
    fn test_decoder_errors_propagate() {
        let err = registry()
            .decode(&obj(json!({"type": "test.samples.ping"})), &Headers::new())
            .unwrap_err();
        assert!(matches!(
            err,
            SignalError::Decode(DecodeError::MissingField { field: "word", .. })
        ));
    }

    #[test]
    fn test_bad_envelopes() {
        let registry = registry();
        let headers = Headers::new();
        assert!(matches!(
            registry.decode(&obj(json!({})), &headers),
            Err(SignalError::Decode(DecodeError::MissingField { field: "type", .. }))
        ));
        assert!(matches!(
            registry.decode(&obj(json!({"type": 5})), &headers),
            Err(SignalError::Decode(DecodeError::WrongShape { field: "type", .. }))
        ));
        assert_eq!(
            registry.decode_value(&json!([1]), &headers),
            Err(SignalError::Decode(DecodeError::NotAnObject))
        );
        assert!(matches!(
            registry.decode_str("{", &headers),
            Err(SignalError::Decode(DecodeError::Malformed(_)))
        ));
    }

    #[test]
    fn test_duplicate_and_malformed_registrations() {
        let duplicate = Registry::build([
            ("test.samples.pong", decode_pong as DecodeFn<Sample>),
            ("test.samples.pong", decode_pong as DecodeFn<Sample>),
        ]);
        assert_eq!(
            duplicate.unwrap_err(),
            RegistryError::DuplicateType("test.samples.pong".to_string())
        );

        let malformed = Registry::build([("pong", decode_pong as DecodeFn<Sample>)]);
        assert_eq!(
            malformed.unwrap_err(),
            RegistryError::MalformedType("pong".to_string())
        );
    }
}
