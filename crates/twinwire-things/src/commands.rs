//! Thing commands
//!
//! Commands ask for a change to (or a view of) a thing. Construction validates
//! ids, pointers and payloads; decoding goes through the same constructors.

use crate::thing::{
    attribute_path, checked, feature_path, feature_property_path, guard_payload, read_feature_id,
    read_thing_id, validate_thing, ATTRIBUTE, FEATURE_ID, PATCH_CONDITIONS, PATCH_PATH,
    PATCH_SCHEMA_VERSION, PROPERTY, SELECTED_FIELDS, THING, THING_ID, VALUE,
};
use twinwire_core::codec::decoding_version;
use twinwire_core::{
    DecodeError, EntityId, Headers, JsonKey, JsonObject, JsonPointer, JsonReader, JsonWriter,
    MergePatch, PatchConditions, SchemaVersion, SignalCodec, SignalError, Value,
};

/// Create a thing from its full JSON representation
#[derive(Debug, Clone, PartialEq)]
pub struct CreateThing {
    entity_id: EntityId,
    thing: Value,
    headers: Headers,
}

envelope!(CreateThing, Command, "things.commands", "createThing");

impl CreateThing {
    pub fn new(entity_id: EntityId, thing: Value, headers: Headers) -> Result<Self, SignalError> {
        validate_thing(&entity_id, &thing)?;
        Ok(Self {
            entity_id,
            thing,
            headers,
        })
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

impl SignalCodec for CreateThing {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&THING, self.thing.clone());
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.value(&THING)?.clone(),
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Retrieve a thing, optionally restricted to some fields
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveThing {
    entity_id: EntityId,
    selected_fields: Vec<JsonPointer>,
    headers: Headers,
}

envelope!(RetrieveThing, Command, "things.commands", "retrieveThing");

impl RetrieveThing {
    pub fn new(entity_id: EntityId, headers: Headers) -> Self {
        Self {
            entity_id,
            selected_fields: Vec::new(),
            headers,
        }
    }

    /// Restrict the view; an empty selection means the whole thing
    #[must_use]
    pub fn with_selected_fields(self, selected_fields: Vec<JsonPointer>) -> Self {
        Self {
            selected_fields,
            ..self
        }
    }

    pub fn selected_fields(&self) -> &[JsonPointer] {
        &self.selected_fields
    }

    fn resource(&self) -> JsonPointer {
        JsonPointer::root()
    }

    fn body(&self) -> Option<Value> {
        None
    }
}

impl SignalCodec for RetrieveThing {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        if !self.selected_fields.is_empty() {
            let selected: Vec<String> =
                self.selected_fields.iter().map(ToString::to_string).collect();
            out.set(&SELECTED_FIELDS, selected);
        }
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let selected_fields = reader
            .read::<Vec<String>>(&SELECTED_FIELDS)?
            .unwrap_or_default()
            .iter()
            .map(|raw| JsonPointer::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        let signal = Self::new(read_thing_id(&reader)?, headers.clone())
            .with_selected_fields(selected_fields);
        checked(&reader, signal)
    }
}

/// Delete a whole thing
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteThing {
    entity_id: EntityId,
    headers: Headers,
}

envelope!(DeleteThing, Command, "things.commands", "deleteThing");

impl DeleteThing {
    pub fn new(entity_id: EntityId, headers: Headers) -> Self {
        Self { entity_id, headers }
    }

    fn resource(&self) -> JsonPointer {
        JsonPointer::root()
    }

    fn body(&self) -> Option<Value> {
        None
    }
}

impl SignalCodec for DeleteThing {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        checked(&reader, Self::new(read_thing_id(&reader)?, headers.clone()))
    }
}

/// Create or replace one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyAttribute {
    entity_id: EntityId,
    attribute: JsonPointer,
    value: Value,
    headers: Headers,
}

envelope!(ModifyAttribute, Command, "things.commands", "modifyAttribute");

impl ModifyAttribute {
    pub fn new(
        entity_id: EntityId,
        attribute: JsonPointer,
        value: Value,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        let attribute = attribute.require_non_empty("modifyAttribute")?;
        guard_payload(&value)?;
        Ok(Self {
            entity_id,
            attribute,
            value,
            headers,
        })
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

impl SignalCodec for ModifyAttribute {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&ATTRIBUTE, self.attribute.to_string());
        out.set(&VALUE, self.value.clone());
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.pointer(&ATTRIBUTE)?,
            reader.value(&VALUE)?.clone(),
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Retrieve one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveAttribute {
    entity_id: EntityId,
    attribute: JsonPointer,
    headers: Headers,
}

envelope!(RetrieveAttribute, Command, "things.commands", "retrieveAttribute");

impl RetrieveAttribute {
    pub fn new(
        entity_id: EntityId,
        attribute: JsonPointer,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            entity_id,
            attribute: attribute.require_non_empty("retrieveAttribute")?,
            headers,
        })
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

impl SignalCodec for RetrieveAttribute {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&ATTRIBUTE, self.attribute.to_string());
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.pointer(&ATTRIBUTE)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Delete one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAttribute {
    entity_id: EntityId,
    attribute: JsonPointer,
    headers: Headers,
}

envelope!(DeleteAttribute, Command, "things.commands", "deleteAttribute");

impl DeleteAttribute {
    pub fn new(
        entity_id: EntityId,
        attribute: JsonPointer,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            entity_id,
            attribute: attribute.require_non_empty("deleteAttribute")?,
            headers,
        })
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

impl SignalCodec for DeleteAttribute {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&ATTRIBUTE, self.attribute.to_string());
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.pointer(&ATTRIBUTE)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Create or replace one property of a feature
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyFeatureProperty {
    entity_id: EntityId,
    feature_id: JsonKey,
    property: JsonPointer,
    value: Value,
    headers: Headers,
}

envelope!(ModifyFeatureProperty, Command, "things.commands", "modifyFeatureProperty");
feature_scoped!(ModifyFeatureProperty);

impl ModifyFeatureProperty {
    pub fn new(
        entity_id: EntityId,
        feature_id: JsonKey,
        property: JsonPointer,
        value: Value,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        let property = property.require_non_empty("modifyFeatureProperty")?;
        guard_payload(&value)?;
        Ok(Self {
            entity_id,
            feature_id,
            property,
            value,
            headers,
        })
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

impl SignalCodec for ModifyFeatureProperty {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&FEATURE_ID, self.feature_id.to_string());
        out.set(&PROPERTY, self.property.to_string());
        out.set(&VALUE, self.value.clone());
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            read_feature_id(&reader)?,
            reader.pointer(&PROPERTY)?,
            reader.value(&VALUE)?.clone(),
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Delete a whole feature
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteFeature {
    entity_id: EntityId,
    feature_id: JsonKey,
    headers: Headers,
}

envelope!(DeleteFeature, Command, "things.commands", "deleteFeature");
feature_scoped!(DeleteFeature);

impl DeleteFeature {
    pub fn new(entity_id: EntityId, feature_id: JsonKey, headers: Headers) -> Self {
        Self {
            entity_id,
            feature_id,
            headers,
        }
    }

    fn resource(&self) -> JsonPointer {
        feature_path(&self.feature_id)
    }

    fn body(&self) -> Option<Value> {
        None
    }
}

impl SignalCodec for DeleteFeature {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&FEATURE_ID, self.feature_id.to_string());
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            read_feature_id(&reader)?,
            headers.clone(),
        );
        checked(&reader, signal)
    }
}

/// Partially update a thing with a JSON merge patch
#[derive(Debug, Clone, PartialEq)]
pub struct MergeThing {
    entity_id: EntityId,
    patch: MergePatch,
    headers: Headers,
}

envelope!(MergeThing, Command, "things.commands", "mergeThing");

impl MergeThing {
    /// Validate the patch at the schema version the headers request
    pub fn new(
        entity_id: EntityId,
        path: JsonPointer,
        value: Value,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        let version = decoding_version(&headers)?;
        Self::at_version(entity_id, path, value, version, headers)
    }

    pub fn at_version(
        entity_id: EntityId,
        path: JsonPointer,
        value: Value,
        version: SchemaVersion,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            entity_id,
            patch: MergePatch::new(path, value, version)?,
            headers,
        })
    }

    #[must_use]
    pub fn with_conditions(self, conditions: PatchConditions) -> Self {
        let Self {
            entity_id,
            patch,
            headers,
        } = self;
        Self {
            entity_id,
            patch: patch.with_conditions(conditions),
            headers,
        }
    }

    pub fn patch(&self) -> &MergePatch {
        &self.patch
    }

    fn resource(&self) -> JsonPointer {
        self.patch.path().clone()
    }

    fn body(&self) -> Option<Value> {
        Some(self.patch.value().clone())
    }
}

impl SignalCodec for MergeThing {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&PATCH_PATH, self.patch.path().to_string());
        out.set(&VALUE, self.patch.value().clone());
        out.set(&PATCH_SCHEMA_VERSION, self.patch.version().as_u8());
        if !self.patch.conditions().is_empty() {
            let conditions: JsonObject = self
                .patch
                .conditions()
                .iter()
                .map(|(path, condition)| (path.to_string(), Value::from(condition.as_str())))
                .collect();
            out.set(&PATCH_CONDITIONS, conditions);
        }
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let conditions = match reader.read::<JsonObject>(&PATCH_CONDITIONS)? {
            Some(raw) => read_conditions(&raw)?,
            None => PatchConditions::new(),
        };
        // a patch from a lenient version stays valid when rendered at a stricter one
        let version = reader
            .read::<SchemaVersion>(&PATCH_SCHEMA_VERSION)?
            .unwrap_or(reader.version());
        let signal = Self::at_version(
            read_thing_id(&reader)?,
            reader.pointer(&PATCH_PATH)?,
            reader.value(&VALUE)?.clone(),
            version,
            headers.clone(),
        )?
        .with_conditions(conditions);
        checked(&reader, signal)
    }
}

/// Condition keys are normalized pointers; two spellings of one path clash
fn read_conditions(raw: &JsonObject) -> Result<PatchConditions, SignalError> {
    let mut conditions = PatchConditions::new();
    for (key, condition) in raw {
        let condition = condition.as_str().ok_or_else(|| DecodeError::WrongShape {
            field: PATCH_CONDITIONS.name,
            detail: format!("condition for '{key}' must be a string"),
        })?;
        let path = JsonPointer::parse(key)?;
        if conditions.contains_key(&path) {
            return Err(DecodeError::Inconsistent {
                field: PATCH_CONDITIONS.name,
                expected: format!("a single condition for '{path}'"),
                found: format!("duplicate key '{key}'"),
            }
            .into());
        }
        conditions.insert(path, condition.to_string());
    }
    Ok(conditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use twinwire_core::{encode, FieldPredicate, Signal, SignalCategory, ValidationError};

    fn thing_id() -> EntityId {
        EntityId::thing("org.example:lamp-1").unwrap()
    }

    fn ptr(s: &str) -> JsonPointer {
        JsonPointer::parse(s).unwrap()
    }

    #[test]
    fn test_modify_attribute_envelope() {
        let cmd = ModifyAttribute::new(thing_id(), ptr("/color"), json!("red"), Headers::new())
            .unwrap();
        assert_eq!(cmd.type_tag(), "things.commands.modifyAttribute");
        assert_eq!(cmd.category(), SignalCategory::Command);
        assert_eq!(cmd.resource_path(), ptr("/attributes/color"));
        assert_eq!(cmd.payload(), Some(json!("red")));
    }

    #[test]
    fn test_attribute_commands_require_pointer() {
        let err = ModifyAttribute::new(thing_id(), JsonPointer::root(), json!(1), Headers::new())
            .unwrap_err();
        assert_eq!(
            err,
            SignalError::Validation(ValidationError::EmptyPointer {
                context: "modifyAttribute"
            })
        );
        assert!(DeleteAttribute::new(thing_id(), JsonPointer::root(), Headers::new()).is_err());
        assert!(RetrieveAttribute::new(thing_id(), JsonPointer::root(), Headers::new()).is_err());
    }

    #[test]
    fn test_with_headers_only_changes_headers() {
        let cmd = DeleteFeature::new(thing_id(), JsonKey::new("lamp").unwrap(), Headers::new());
        let headers = Headers::new().with_correlation_id("c-1");
        let changed = cmd.with_headers(headers.clone());
        assert_eq!(changed.headers(), &headers);
        assert_eq!(changed.entity_id(), cmd.entity_id());
        assert_eq!(changed.resource_path(), cmd.resource_path());
        assert_eq!(cmd.headers(), &Headers::new());
    }

    #[test]
    fn test_retrieve_thing_selected_fields() {
        let cmd = RetrieveThing::new(thing_id(), Headers::new())
            .with_selected_fields(vec![ptr("/attributes/color"), ptr("/features")]);
        let wire = encode(&cmd, SchemaVersion::V2, &FieldPredicate::not_hidden());
        assert_eq!(wire["selectedFields"], json!(["/attributes/color", "/features"]));
        assert_eq!(RetrieveThing::decode(&wire, &Headers::new()).unwrap(), cmd);
    }

    #[test]
    fn test_selected_fields_keep_commas_and_spaces() {
        let cmd = RetrieveThing::new(thing_id(), Headers::new())
            .with_selected_fields(vec![ptr("/a,b"), ptr("/x "), ptr("/attributes/ y")]);
        for version in SchemaVersion::ALL {
            let wire = encode(&cmd, version, &FieldPredicate::always());
            let decoded = RetrieveThing::decode(&wire, &Headers::new()).unwrap();
            assert_eq!(decoded.selected_fields(), cmd.selected_fields());
            assert_eq!(decoded, cmd);
        }
    }

    #[test]
    fn test_merge_thing_conditions_survive() {
        let mut conditions = PatchConditions::new();
        conditions.insert(ptr("/attributes/color"), "eq(attributes/color,\"blue\")".to_string());
        let cmd = MergeThing::new(
            thing_id(),
            JsonPointer::root(),
            json!({"attributes": {"color": "red", "size": null}}),
            Headers::new(),
        )
        .unwrap()
        .with_conditions(conditions);
        let wire = encode(&cmd, SchemaVersion::V1, &FieldPredicate::always());
        let decoded = MergeThing::decode(&wire, &Headers::new()).unwrap();
        assert_eq!(decoded, cmd);
        assert_eq!(decoded.patch().conditions().len(), 1);
    }

    #[test]
    fn test_lenient_empty_merge_survives_strict_rendering() {
        let cmd = MergeThing::at_version(
            thing_id(),
            JsonPointer::root(),
            json!({}),
            SchemaVersion::V1,
            Headers::new(),
        )
        .unwrap();
        for version in SchemaVersion::ALL {
            let wire = encode(&cmd, version, &FieldPredicate::always());
            assert_eq!(wire["patchSchemaVersion"], json!(1));
            assert_eq!(MergeThing::decode(&wire, &Headers::new()).unwrap(), cmd);
        }

        // without the patch version the rendering version decides
        let mut wire = encode(&cmd, SchemaVersion::V2, &FieldPredicate::always());
        wire.remove("patchSchemaVersion");
        assert!(matches!(
            MergeThing::decode(&wire, &Headers::new()),
            Err(SignalError::MergePatchNoOp { .. })
        ));
    }

    #[test]
    fn test_condition_keys_must_be_distinct_paths() {
        let wire = json!({
            "type": "things.commands.mergeThing",
            "thingId": "org.example:lamp-1",
            "path": "/attributes",
            "value": {"color": "red"},
            "patchConditions": {"": "exists(thingId)", "/": "exists(attributes)"}
        });
        let err = MergeThing::decode(wire.as_object().unwrap(), &Headers::new()).unwrap_err();
        assert!(matches!(
            err,
            SignalError::Decode(DecodeError::Inconsistent { field: "patchConditions", .. })
        ));

        let spelled = json!({
            "type": "things.commands.mergeThing",
            "thingId": "org.example:lamp-1",
            "path": "/attributes",
            "value": {"color": "red"},
            "patchConditions": {"color": "a", "/color": "b"}
        });
        assert!(MergeThing::decode(spelled.as_object().unwrap(), &Headers::new()).is_err());
    }

    #[test]
    fn test_merge_thing_rejects_empty_root_patch() {
        let err = MergeThing::new(thing_id(), JsonPointer::root(), json!({}), Headers::new())
            .unwrap_err();
        assert!(matches!(err, SignalError::MergePatchNoOp { .. }));
    }

    #[test]
    fn test_decode_rejects_inconsistent_resource_path() {
        let wire = json!({
            "type": "things.commands.deleteFeature",
            "thingId": "org.example:lamp-1",
            "featureId": "lamp",
            "resourcePath": "/features/other"
        });
        let err = DeleteFeature::decode(wire.as_object().unwrap(), &Headers::new()).unwrap_err();
        assert!(matches!(
            err,
            SignalError::Decode(DecodeError::Inconsistent { field: "resourcePath", .. })
        ));
    }

    #[test]
    fn test_create_thing_validates_payload() {
        assert!(CreateThing::new(thing_id(), json!({"attributes": {}}), Headers::new()).is_ok());
        assert!(CreateThing::new(thing_id(), json!("nope"), Headers::new()).is_err());
    }
}
