//! Thing layout, wire fields and payload checks shared by the catalog

use chrono::{DateTime, SecondsFormat, Utc};
use twinwire_core::codec::fields;
use twinwire_core::{
    EntityId, FieldDefinition, HttpStatus, JsonKey, JsonPointer, JsonReader, JsonWriter, Signal,
    SignalError, SizeGuard, ValidationError, Value,
};

pub const ATTRIBUTES: &str = "attributes";
pub const FEATURES: &str = "features";
pub const PROPERTIES: &str = "properties";

pub const THING_ID: FieldDefinition = FieldDefinition::regular("thingId");
pub const CONNECTION_ID: FieldDefinition = FieldDefinition::regular("connectionId");
pub const THING: FieldDefinition = FieldDefinition::regular("thing");
pub const ATTRIBUTE: FieldDefinition = FieldDefinition::regular("attribute");
pub const FEATURE_ID: FieldDefinition = FieldDefinition::regular("featureId");
pub const PROPERTY: FieldDefinition = FieldDefinition::regular("property");
pub const VALUE: FieldDefinition = FieldDefinition::regular("value");
pub const SELECTED_FIELDS: FieldDefinition = FieldDefinition::regular("selectedFields").optional();
pub const PATCH_PATH: FieldDefinition = FieldDefinition::regular("path");
pub const PATCH_CONDITIONS: FieldDefinition =
    FieldDefinition::regular("patchConditions").optional();
/// Version the patch was validated at
pub const PATCH_SCHEMA_VERSION: FieldDefinition =
    FieldDefinition::regular("patchSchemaVersion").optional();
pub const MERGE_STATUS: FieldDefinition = FieldDefinition::regular("mergeStatus");
pub const PATCH: FieldDefinition = FieldDefinition::regular("patch");

/// `/attributes`
pub fn attributes_path() -> JsonPointer {
    JsonKey::from_static(ATTRIBUTES).into()
}

/// `/attributes/<attribute>`
pub fn attribute_path(attribute: &JsonPointer) -> JsonPointer {
    attributes_path().concat(attribute)
}

/// `/features/<feature>`
pub fn feature_path(feature_id: &JsonKey) -> JsonPointer {
    JsonPointer::from(JsonKey::from_static(FEATURES)).append(feature_id.clone())
}

/// `/features/<feature>/properties/<property>`
pub fn feature_property_path(feature_id: &JsonKey, property: &JsonPointer) -> JsonPointer {
    feature_path(feature_id)
        .append(JsonKey::from_static(PROPERTIES))
        .concat(property)
}

/// A full thing must be an object whose embedded id, if any, matches
pub(crate) fn validate_thing(entity_id: &EntityId, thing: &Value) -> Result<(), SignalError> {
    let object = thing
        .as_object()
        .ok_or(ValidationError::NotAnObject { context: "a thing" })?;
    if let Some(embedded) = object.get(THING_ID.name) {
        if embedded.as_str() != Some(entity_id.to_string().as_str()) {
            return Err(ValidationError::InvalidEntityId {
                id: embedded.to_string(),
                reason: format!("does not match the addressed thing {entity_id}"),
            }
            .into());
        }
    }
    guard_payload(thing)
}

/// Key and size guard for payload values
pub(crate) fn guard_payload(value: &Value) -> Result<(), SignalError> {
    SizeGuard::current().check(value).map(|_| ())
}

/// Last decoding step: the wire envelope must agree with the rebuilt signal
pub(crate) fn checked<S: Signal>(reader: &JsonReader<'_>, signal: S) -> Result<S, SignalError> {
    reader.expect_envelope(signal.type_tag(), &signal.resource_path())?;
    Ok(signal)
}

pub(crate) fn read_thing_id(reader: &JsonReader<'_>) -> Result<EntityId, SignalError> {
    Ok(EntityId::thing(reader.str(&THING_ID)?)?)
}

pub(crate) fn read_connection_id(reader: &JsonReader<'_>) -> Result<EntityId, SignalError> {
    Ok(EntityId::connection(reader.str(&CONNECTION_ID)?)?)
}

pub(crate) fn read_feature_id(reader: &JsonReader<'_>) -> Result<JsonKey, SignalError> {
    Ok(JsonKey::new(reader.str(&FEATURE_ID)?)?)
}

pub(crate) fn read_status(reader: &JsonReader<'_>) -> Result<HttpStatus, SignalError> {
    Ok(reader.required::<HttpStatus>(&fields::STATUS)?)
}

pub(crate) fn write_status(out: &mut JsonWriter, status: HttpStatus) {
    out.set(&fields::STATUS, status.as_u16());
}

pub(crate) fn read_revision(reader: &JsonReader<'_>) -> Result<u64, SignalError> {
    Ok(reader.required::<u64>(&fields::REVISION)?)
}

pub(crate) fn read_timestamp(reader: &JsonReader<'_>) -> Result<Option<DateTime<Utc>>, SignalError> {
    Ok(reader.read::<DateTime<Utc>>(&fields::TIMESTAMP)?)
}

pub(crate) fn write_timestamp(out: &mut JsonWriter, timestamp: Option<DateTime<Utc>>) {
    out.set_opt(
        &fields::TIMESTAMP,
        timestamp.map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    );
}
