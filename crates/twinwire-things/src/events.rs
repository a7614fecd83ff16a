//! Thing events
//!
//! Events record a change that already happened. All thing events carry the
//! entity revision the change produced and an optional timestamp.

use crate::commands::{
    CreateThing, DeleteAttribute, DeleteFeature, DeleteThing, MergeThing, ModifyAttribute,
    ModifyFeatureProperty,
};
use crate::thing::{
    attribute_path, checked, feature_path, feature_property_path, guard_payload, read_feature_id,
    read_revision, read_thing_id, read_timestamp, validate_thing, write_timestamp, ATTRIBUTE,
    FEATURE_ID, PATCH_PATH, PROPERTY, THING, THING_ID, VALUE,
};
use chrono::{DateTime, Utc};
use twinwire_core::codec::fields;
use twinwire_core::{
    ensure_root_object, EntityId, Headers, JsonKey, JsonObject, JsonPointer, JsonReader,
    JsonWriter, Signal, SignalCodec, SignalError, Value, WithFeatureId,
};

fn write_revision(out: &mut JsonWriter, revision: u64) {
    out.set(&fields::REVISION, revision);
}

/// A thing was created
#[derive(Debug, Clone, PartialEq)]
pub struct ThingCreated {
    entity_id: EntityId,
    thing: Value,
    revision: u64,
    timestamp: Option<DateTime<Utc>>,
    headers: Headers,
}

envelope!(ThingCreated, Event, "things.events", "thingCreated");
revisioned!(ThingCreated);
timestamped!(ThingCreated);

impl ThingCreated {
    pub fn new(
        entity_id: EntityId,
        thing: Value,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        validate_thing(&entity_id, &thing)?;
        Ok(Self {
            entity_id,
            thing,
            revision,
            timestamp,
            headers,
        })
    }

    pub fn from_command(
        command: &CreateThing,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.thing().clone(),
            revision,
            timestamp,
            command.headers().clone(),
        )
    }

    pub fn thing(&self) -> &Value {
        &self.thing
    }

    fn resource(&self) -> JsonPointer {
        JsonPointer::root()
    }

    fn body(&self) -> Option<Value> {
        Some(self.thing.clone())
    }
}

impl SignalCodec for ThingCreated {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&THING, self.thing.clone());
        write_revision(out, self.revision);
        write_timestamp(out, self.timestamp);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.value(&THING)?.clone(),
            read_revision(&reader)?,
            read_timestamp(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// A thing was deleted
#[derive(Debug, Clone, PartialEq)]
pub struct ThingDeleted {
    entity_id: EntityId,
    revision: u64,
    timestamp: Option<DateTime<Utc>>,
    headers: Headers,
}

envelope!(ThingDeleted, Event, "things.events", "thingDeleted");
revisioned!(ThingDeleted);
timestamped!(ThingDeleted);

impl ThingDeleted {
    pub fn new(
        entity_id: EntityId,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
        headers: Headers,
    ) -> Self {
        Self {
            entity_id,
            revision,
            timestamp,
            headers,
        }
    }

    pub fn from_command(
        command: &DeleteThing,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self::new(
            command.entity_id().clone(),
            revision,
            timestamp,
            command.headers().clone(),
        )
    }

    fn resource(&self) -> JsonPointer {
        JsonPointer::root()
    }

    fn body(&self) -> Option<Value> {
        None
    }
}

impl SignalCodec for ThingDeleted {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        write_revision(out, self.revision);
        write_timestamp(out, self.timestamp);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            read_revision(&reader)?,
            read_timestamp(&reader)?,
            headers.clone(),
        );
        checked(&reader, signal)
    }
}

/// Events setting one attribute to a value; they differ only in their type
macro_rules! attribute_value_event {
    ($(#[$doc:meta])* $ty:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $ty {
            entity_id: EntityId,
            attribute: JsonPointer,
            value: Value,
            revision: u64,
            timestamp: Option<DateTime<Utc>>,
            headers: Headers,
        }

        envelope!($ty, Event, "things.events", $name);
        revisioned!($ty);
        timestamped!($ty);

        impl $ty {
            pub fn new(
                entity_id: EntityId,
                attribute: JsonPointer,
                value: Value,
                revision: u64,
                timestamp: Option<DateTime<Utc>>,
                headers: Headers,
            ) -> Result<Self, SignalError> {
                let attribute = attribute.require_non_empty($name)?;
                guard_payload(&value)?;
                Ok(Self {
                    entity_id,
                    attribute,
                    value,
                    revision,
                    timestamp,
                    headers,
                })
            }

            pub fn from_command(
                command: &ModifyAttribute,
                revision: u64,
                timestamp: Option<DateTime<Utc>>,
            ) -> Result<Self, SignalError> {
                Self::new(
                    command.entity_id().clone(),
                    command.attribute().clone(),
                    command.value().clone(),
                    revision,
                    timestamp,
                    command.headers().clone(),
                )
            }

            pub fn attribute(&self) -> &JsonPointer {
                &self.attribute
            }

            pub fn value(&self) -> &Value {
                &self.value
            }

            fn resource(&self) -> JsonPointer {
                attribute_path(&self.attribute)
            }

            fn body(&self) -> Option<Value> {
                Some(self.value.clone())
            }
        }

        impl SignalCodec for $ty {
            fn write_fields(&self, out: &mut JsonWriter) {
                out.set(&THING_ID, self.entity_id.to_string());
                out.set(&ATTRIBUTE, self.attribute.to_string());
                out.set(&VALUE, self.value.clone());
                write_revision(out, self.revision);
                write_timestamp(out, self.timestamp);
            }

            fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
                let reader = JsonReader::for_headers(object, headers)?;
                let signal = Self::new(
                    read_thing_id(&reader)?,
                    reader.pointer(&ATTRIBUTE)?,
                    reader.value(&VALUE)?.clone(),
                    read_revision(&reader)?,
                    read_timestamp(&reader)?,
                    headers.clone(),
                )?;
                checked(&reader, signal)
            }
        }
    };
}

attribute_value_event!(
    /// An attribute that did not exist was set
    AttributeCreated,
    "attributeCreated"
);
attribute_value_event!(
    /// An existing attribute was replaced
    AttributeModified,
    "attributeModified"
);

/// An attribute was removed
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDeleted {
    entity_id: EntityId,
    attribute: JsonPointer,
    revision: u64,
    timestamp: Option<DateTime<Utc>>,
    headers: Headers,
}

envelope!(AttributeDeleted, Event, "things.events", "attributeDeleted");
revisioned!(AttributeDeleted);
timestamped!(AttributeDeleted);

impl AttributeDeleted {
    pub fn new(
        entity_id: EntityId,
        attribute: JsonPointer,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            entity_id,
            attribute: attribute.require_non_empty("attributeDeleted")?,
            revision,
            timestamp,
            headers,
        })
    }

    pub fn from_command(
        command: &DeleteAttribute,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.attribute().clone(),
            revision,
            timestamp,
            command.headers().clone(),
        )
    }

    pub fn attribute(&self) -> &JsonPointer {
        &self.attribute
    }

    fn resource(&self) -> JsonPointer {
        attribute_path(&self.attribute)
    }

    fn body(&self) -> Option<Value> {
        None
    }
}

impl SignalCodec for AttributeDeleted {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&ATTRIBUTE, self.attribute.to_string());
        write_revision(out, self.revision);
        write_timestamp(out, self.timestamp);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.pointer(&ATTRIBUTE)?,
            read_revision(&reader)?,
            read_timestamp(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// A feature property was set
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePropertyModified {
    entity_id: EntityId,
    feature_id: JsonKey,
    property: JsonPointer,
    value: Value,
    revision: u64,
    timestamp: Option<DateTime<Utc>>,
    headers: Headers,
}

envelope!(FeaturePropertyModified, Event, "things.events", "featurePropertyModified");
revisioned!(FeaturePropertyModified);
timestamped!(FeaturePropertyModified);
feature_scoped!(FeaturePropertyModified);

impl FeaturePropertyModified {
    pub fn new(
        entity_id: EntityId,
        feature_id: JsonKey,
        property: JsonPointer,
        value: Value,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        let property = property.require_non_empty("featurePropertyModified")?;
        guard_payload(&value)?;
        Ok(Self {
            entity_id,
            feature_id,
            property,
            value,
            revision,
            timestamp,
            headers,
        })
    }

    pub fn from_command(
        command: &ModifyFeatureProperty,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.feature_id().clone(),
            command.property().clone(),
            command.value().clone(),
            revision,
            timestamp,
            command.headers().clone(),
        )
    }

    pub fn property(&self) -> &JsonPointer {
        &self.property
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn resource(&self) -> JsonPointer {
        feature_property_path(&self.feature_id, &self.property)
    }

    fn body(&self) -> Option<Value> {
        Some(self.value.clone())
    }
}

impl SignalCodec for FeaturePropertyModified {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&FEATURE_ID, self.feature_id.to_string());
        out.set(&PROPERTY, self.property.to_string());
        out.set(&VALUE, self.value.clone());
        write_revision(out, self.revision);
        write_timestamp(out, self.timestamp);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            read_feature_id(&reader)?,
            reader.pointer(&PROPERTY)?,
            reader.value(&VALUE)?.clone(),
            read_revision(&reader)?,
            read_timestamp(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// A whole feature was removed
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDeleted {
    entity_id: EntityId,
    feature_id: JsonKey,
    revision: u64,
    timestamp: Option<DateTime<Utc>>,
    headers: Headers,
}

envelope!(FeatureDeleted, Event, "things.events", "featureDeleted");
revisioned!(FeatureDeleted);
timestamped!(FeatureDeleted);
feature_scoped!(FeatureDeleted);

impl FeatureDeleted {
    pub fn new(
        entity_id: EntityId,
        feature_id: JsonKey,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
        headers: Headers,
    ) -> Self {
        Self {
            entity_id,
            feature_id,
            revision,
            timestamp,
            headers,
        }
    }

    pub fn from_command(
        command: &DeleteFeature,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self::new(
            command.entity_id().clone(),
            command.feature_id().clone(),
            revision,
            timestamp,
            command.headers().clone(),
        )
    }

    fn resource(&self) -> JsonPointer {
        feature_path(&self.feature_id)
    }

    fn body(&self) -> Option<Value> {
        None
    }
}

impl SignalCodec for FeatureDeleted {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&FEATURE_ID, self.feature_id.to_string());
        write_revision(out, self.revision);
        write_timestamp(out, self.timestamp);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            read_feature_id(&reader)?,
            read_revision(&reader)?,
            read_timestamp(&reader)?,
            headers.clone(),
        );
        checked(&reader, signal)
    }
}

/// A merge patch was applied
#[derive(Debug, Clone, PartialEq)]
pub struct ThingMerged {
    entity_id: EntityId,
    path: JsonPointer,
    value: Value,
    revision: u64,
    timestamp: Option<DateTime<Utc>>,
    headers: Headers,
}

envelope!(ThingMerged, Event, "things.events", "thingMerged");
revisioned!(ThingMerged);
timestamped!(ThingMerged);

impl ThingMerged {
    pub fn new(
        entity_id: EntityId,
        path: JsonPointer,
        value: Value,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        ensure_root_object(&path, &value)?;
        guard_payload(&value)?;
        Ok(Self {
            entity_id,
            path,
            value,
            revision,
            timestamp,
            headers,
        })
    }

    pub fn from_command(
        command: &MergeThing,
        revision: u64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.patch().path().clone(),
            command.patch().value().clone(),
            revision,
            timestamp,
            command.headers().clone(),
        )
    }

    pub fn path(&self) -> &JsonPointer {
        &self.path
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn resource(&self) -> JsonPointer {
        self.path.clone()
    }

    fn body(&self) -> Option<Value> {
        Some(self.value.clone())
    }
}

impl SignalCodec for ThingMerged {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&PATCH_PATH, self.path.to_string());
        out.set(&VALUE, self.value.clone());
        write_revision(out, self.revision);
        write_timestamp(out, self.timestamp);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.pointer(&PATCH_PATH)?,
            reader.value(&VALUE)?.clone(),
            read_revision(&reader)?,
            read_timestamp(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use twinwire_core::{encode, FieldPredicate, SchemaVersion, WithRevision, WithTimestamp};

    fn thing_id() -> EntityId {
        EntityId::thing("org.example:lamp-1").unwrap()
    }

    #[test]
    fn test_event_from_command() {
        let cmd = ModifyAttribute::new(
            thing_id(),
            JsonPointer::parse("/color").unwrap(),
            json!("red"),
            Headers::new().with_correlation_id("c-9"),
        )
        .unwrap();
        let event = AttributeModified::from_command(&cmd, 4, None).unwrap();
        assert_eq!(event.type_tag(), "things.events.attributeModified");
        assert_eq!(event.revision(), 4);
        assert_eq!(event.headers().correlation_id(), Some("c-9"));
        assert_eq!(event.resource_path(), cmd.resource_path());

        let bumped = event.with_revision(5);
        assert_eq!(bumped.revision(), 5);
        assert_eq!(bumped.value(), event.value());
    }

    #[test]
    fn test_timestamp_is_special_field() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let event = ThingDeleted::new(thing_id(), 7, Some(at), Headers::new());

        let full = encode(&event, SchemaVersion::V2, &FieldPredicate::always());
        assert_eq!(full["_timestamp"], json!("2024-03-01T12:30:00Z"));
        assert_eq!(full["revision"], json!(7));
        let decoded = ThingDeleted::decode(&full, &Headers::new()).unwrap();
        assert_eq!(decoded.timestamp(), Some(at));

        let regular_only = encode(
            &event,
            SchemaVersion::V2,
            &FieldPredicate::kind(twinwire_core::FieldKind::Regular),
        );
        assert!(!regular_only.contains_key("_timestamp"));
        assert_eq!(
            ThingDeleted::decode(&regular_only, &Headers::new())
                .unwrap()
                .timestamp(),
            None
        );
    }

    #[test]
    fn test_missing_revision_is_fatal() {
        let wire = json!({
            "type": "things.events.featureDeleted",
            "thingId": "org.example:lamp-1",
            "featureId": "lamp"
        });
        let err = FeatureDeleted::decode(wire.as_object().unwrap(), &Headers::new()).unwrap_err();
        assert!(matches!(
            err,
            SignalError::Decode(twinwire_core::DecodeError::MissingField { field: "revision", .. })
        ));
    }

    #[test]
    fn test_thing_merged_path() {
        let event = ThingMerged::new(
            thing_id(),
            JsonPointer::parse("/attributes").unwrap(),
            json!({"color": null}),
            2,
            None,
            Headers::new(),
        )
        .unwrap();
        assert_eq!(event.resource_path().to_string(), "/attributes");
        assert_eq!(event.payload(), Some(json!({"color": null})));
    }
}
