//! Versioned codec
//!
//! A field is written only when it exists in the requested schema version
//! *and* the caller's predicate accepts it. Decoding looks fields up by name:
//! missing required fields are fatal, missing optional fields become `None`,
//! and unknown fields are ignored.

use crate::config::ProtocolConfig;
use crate::error::{DecodeError, SignalError};
use crate::field::{FieldDefinition, FieldPredicate};
use crate::headers::Headers;
use crate::signal::Signal;
use crate::value::{JsonObject, JsonPointer, Value};
use crate::version::SchemaVersion;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Fields shared by all signal variants
pub mod fields {
    use crate::field::FieldDefinition;
    use crate::version::SchemaVersion;

    pub const TYPE: FieldDefinition = FieldDefinition::regular("type");
    /// Derived resource path; informational, introduced with V2
    pub const PATH: FieldDefinition = FieldDefinition::regular("resourcePath")
        .since(SchemaVersion::V2)
        .optional();
    pub const STATUS: FieldDefinition = FieldDefinition::regular("status");
    pub const REVISION: FieldDefinition = FieldDefinition::regular("revision");
    pub const TIMESTAMP: FieldDefinition = FieldDefinition::special("_timestamp").optional();
    /// Version the object was rendered at
    pub const SCHEMA_VERSION: FieldDefinition = FieldDefinition::hidden("__schemaVersion").optional();
}

/// Encode/decode capability of a concrete signal
pub trait SignalCodec: Signal + Sized {
    /// Write the variant-specific fields; the envelope fields are written by
    /// [`encode`]
    fn write_fields(&self, out: &mut JsonWriter);

    /// Reconstruct and re-validate the variant from its wire object
    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError>;
}

/// Render a signal at `version`, keeping fields accepted by `predicate`
pub fn encode<S: SignalCodec>(
    signal: &S,
    version: SchemaVersion,
    predicate: &FieldPredicate,
) -> JsonObject {
    let mut out = JsonWriter::new(version, predicate.clone());
    out.set(&fields::TYPE, signal.type_tag());
    out.set(&fields::PATH, signal.resource_path().to_string());
    out.set(&fields::SCHEMA_VERSION, version.as_u8());
    signal.write_fields(&mut out);
    out.finish()
}

/// Version to decode with: the `version` header, else the configured default
pub fn decoding_version(headers: &Headers) -> Result<SchemaVersion, SignalError> {
    Ok(headers
        .schema_version()?
        .unwrap_or(ProtocolConfig::current().default_schema_version))
}

/// Builds a wire object, dropping fields the version or predicate exclude
#[derive(Debug)]
pub struct JsonWriter {
    version: SchemaVersion,
    predicate: FieldPredicate,
    object: JsonObject,
}

impl JsonWriter {
    pub fn new(version: SchemaVersion, predicate: FieldPredicate) -> Self {
        Self {
            version,
            predicate,
            object: JsonObject::new(),
        }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn includes(&self, field: &FieldDefinition) -> bool {
        field.exists_in(self.version) && self.predicate.test(field)
    }

    pub fn set(&mut self, field: &FieldDefinition, value: impl Into<Value>) {
        if self.includes(field) {
            self.object.insert(field.name.to_string(), value.into());
        }
    }

    pub fn set_opt<V: Into<Value>>(&mut self, field: &FieldDefinition, value: Option<V>) {
        if let Some(value) = value {
            self.set(field, value);
        }
    }

    pub fn finish(self) -> JsonObject {
        self.object
    }
}

/// Reads fields out of a wire object at a given schema version
#[derive(Debug, Clone, Copy)]
pub struct JsonReader<'a> {
    object: &'a JsonObject,
    version: SchemaVersion,
}

impl<'a> JsonReader<'a> {
    pub fn new(object: &'a JsonObject, version: SchemaVersion) -> Self {
        Self { object, version }
    }

    /// Reader at the version requested by `headers`, else the version the
    /// object declares it was rendered at, else the configured default
    pub fn for_headers(object: &'a JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        if let Some(version) = headers.schema_version()? {
            return Ok(Self::new(object, version));
        }
        let rendered = object
            .get(fields::SCHEMA_VERSION.name)
            .and_then(Value::as_u64)
            .and_then(|v| u8::try_from(v).ok())
            .and_then(SchemaVersion::from_u8);
        match rendered {
            Some(version) => Ok(Self::new(object, version)),
            None => Ok(Self::new(object, decoding_version(headers)?)),
        }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    fn lookup(&self, field: &FieldDefinition) -> Option<&'a Value> {
        if field.exists_in(self.version) {
            self.object.get(field.name)
        } else {
            None
        }
    }

    fn envelope(&self, field: &FieldDefinition) -> Option<&'a Value> {
        self.lookup(field).filter(|v| !v.is_null())
    }

    fn missing(&self, field: &FieldDefinition) -> DecodeError {
        DecodeError::MissingField {
            field: field.name,
            version: self.version,
        }
    }

    /// Raw value as the field's definition dictates: absent and required is
    /// [`DecodeError::MissingField`], absent and optional is `None`. JSON
    /// `null` counts as present.
    pub fn get(&self, field: &FieldDefinition) -> Result<Option<&'a Value>, DecodeError> {
        match self.lookup(field) {
            Some(value) => Ok(Some(value)),
            None if field.required => Err(self.missing(field)),
            None => Ok(None),
        }
    }

    /// Typed value as the definition dictates; `null` in an optional field
    /// reads as `None`
    pub fn read<T: DeserializeOwned>(
        &self,
        field: &FieldDefinition,
    ) -> Result<Option<T>, DecodeError> {
        match self.get(field)? {
            Some(value) if field.required || !value.is_null() => parse(field, value).map(Some),
            _ => Ok(None),
        }
    }

    /// Raw value of a field declared required
    pub fn value(&self, field: &FieldDefinition) -> Result<&'a Value, DecodeError> {
        debug_assert!(field.required, "`{}` is declared optional", field.name);
        self.get(field)?.ok_or_else(|| self.missing(field))
    }

    /// Typed value of a field declared required
    pub fn required<T: DeserializeOwned>(&self, field: &FieldDefinition) -> Result<T, DecodeError> {
        parse(field, self.value(field)?)
    }

    pub fn str(&self, field: &FieldDefinition) -> Result<&'a str, DecodeError> {
        let value = self.value(field)?;
        value.as_str().ok_or_else(|| wrong_shape(field, "expected a string", value))
    }

    pub fn object(&self, field: &FieldDefinition) -> Result<&'a JsonObject, DecodeError> {
        let value = self.value(field)?;
        value
            .as_object()
            .ok_or_else(|| wrong_shape(field, "expected an object", value))
    }

    /// Required field parsed as a pointer, re-validated
    pub fn pointer(&self, field: &FieldDefinition) -> Result<JsonPointer, SignalError> {
        Ok(JsonPointer::parse(self.str(field)?)?)
    }

    /// Check the envelope fields a decoder does not consume itself: `type`
    /// must match when present, and `path` must agree with the derived path
    pub fn expect_envelope(&self, type_tag: &str, path: &JsonPointer) -> Result<(), SignalError> {
        if let Some(found) = self.envelope(&fields::TYPE) {
            if found.as_str() != Some(type_tag) {
                return Err(DecodeError::Inconsistent {
                    field: fields::TYPE.name,
                    expected: type_tag.to_string(),
                    found: found.to_string(),
                }
                .into());
            }
        }
        if let Some(found) = self.envelope(&fields::PATH) {
            let matches = found
                .as_str()
                .and_then(|raw| JsonPointer::parse(raw).ok())
                .is_some_and(|parsed| &parsed == path);
            if !matches {
                return Err(DecodeError::Inconsistent {
                    field: fields::PATH.name,
                    expected: path.to_string(),
                    found: found.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(field: &FieldDefinition, value: &Value) -> Result<T, DecodeError> {
    <T as Deserialize>::deserialize(value).map_err(|e| DecodeError::WrongShape {
        field: field.name,
        detail: e.to_string(),
    })
}

fn wrong_shape(field: &FieldDefinition, expected: &str, found: &Value) -> DecodeError {
    DecodeError::WrongShape {
        field: field.name,
        detail: format!("{expected}, found {found}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;
    use serde_json::json;

    const NAME: FieldDefinition = FieldDefinition::regular("name");
    const SECRET: FieldDefinition = FieldDefinition::hidden("secret").optional();
    const NEW_FIELD: FieldDefinition = FieldDefinition::regular("fresh").since(SchemaVersion::V2);

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_writer_gates_version_and_predicate() {
        let write = |version, predicate| {
            let mut out = JsonWriter::new(version, predicate);
            out.set(&NAME, "lamp");
            out.set(&SECRET, 42);
            out.set(&NEW_FIELD, true);
            out.set_opt(&NAME, None::<String>);
            out.finish()
        };

        let v1 = write(SchemaVersion::V1, FieldPredicate::not_hidden());
        assert_eq!(Value::Object(v1), json!({"name": "lamp"}));

        let v2 = write(SchemaVersion::V2, FieldPredicate::always());
        assert_eq!(
            Value::Object(v2),
            json!({"name": "lamp", "secret": 42, "fresh": true})
        );

        let only_hidden = write(SchemaVersion::V2, FieldPredicate::kind(FieldKind::Hidden));
        assert_eq!(Value::Object(only_hidden), json!({"secret": 42}));
    }

    #[test]
    fn test_reader_required_and_optional() {
        let obj = object(json!({"name": "lamp", "fresh": true, "unknown": 1}));
        let reader = JsonReader::new(&obj, SchemaVersion::V2);
        assert_eq!(reader.str(&NAME), Ok("lamp"));
        assert_eq!(reader.required::<bool>(&NEW_FIELD), Ok(true));
        assert_eq!(reader.read::<u64>(&SECRET), Ok(None));
        assert_eq!(reader.get(&SECRET), Ok(None));

        // field outside the version is invisible
        let v1 = JsonReader::new(&obj, SchemaVersion::V1);
        assert_eq!(
            v1.required::<bool>(&NEW_FIELD),
            Err(DecodeError::MissingField {
                field: "fresh",
                version: SchemaVersion::V1
            })
        );
    }

    #[test]
    fn test_reader_follows_field_declaration() {
        let obj = object(json!({"secret": null}));
        let reader = JsonReader::new(&obj, SchemaVersion::V2);

        // an explicit null is present; a typed optional read sees nothing
        assert_eq!(reader.get(&SECRET), Ok(Some(&Value::Null)));
        assert_eq!(reader.read::<u64>(&SECRET), Ok(None));

        let missing = DecodeError::MissingField {
            field: "name",
            version: SchemaVersion::V2,
        };
        assert_eq!(reader.get(&NAME), Err(missing.clone()));
        assert_eq!(reader.read::<String>(&NAME), Err(missing));
    }

    #[test]
    fn test_reader_wrong_shape() {
        let obj = object(json!({"name": 7}));
        let reader = JsonReader::new(&obj, SchemaVersion::V2);
        assert!(matches!(
            reader.str(&NAME),
            Err(DecodeError::WrongShape { field: "name", .. })
        ));
        assert!(matches!(
            reader.required::<String>(&NAME),
            Err(DecodeError::WrongShape { field: "name", .. })
        ));
    }

    #[test]
    fn test_reader_version_resolution() {
        let obj = object(json!({"__schemaVersion": 1}));
        let plain = JsonReader::for_headers(&obj, &Headers::new()).unwrap();
        assert_eq!(plain.version(), SchemaVersion::V1);

        let requested = Headers::new().with_schema_version(SchemaVersion::V2);
        let explicit = JsonReader::for_headers(&obj, &requested).unwrap();
        assert_eq!(explicit.version(), SchemaVersion::V2);

        let bare = object(json!({}));
        let fallback = JsonReader::for_headers(&bare, &Headers::new()).unwrap();
        assert_eq!(fallback.version(), ProtocolConfig::current().default_schema_version);
    }

    #[test]
    fn test_expect_envelope() {
        let path = JsonPointer::parse("/attributes/color").unwrap();
        let obj = object(json!({"type": "a.b", "resourcePath": "/attributes/color"}));
        let reader = JsonReader::new(&obj, SchemaVersion::V2);
        assert!(reader.expect_envelope("a.b", &path).is_ok());
        assert!(reader.expect_envelope("a.c", &path).is_err());
        assert!(reader
            .expect_envelope("a.b", &JsonPointer::root())
            .is_err());

        // V1 ignores the path field entirely
        let v1 = JsonReader::new(&obj, SchemaVersion::V1);
        assert!(v1.expect_envelope("a.b", &JsonPointer::root()).is_ok());
    }
}
