//! Thing command responses
//!
//! Every response declares a [`StatusContract`]; constructors run the status
//! and the presence of a body through it. Factories build the response for a
//! given command and copy the command's headers.

use crate::commands::{
    CreateThing, DeleteAttribute, DeleteFeature, DeleteThing, MergeThing, ModifyAttribute,
    ModifyFeatureProperty, RetrieveAttribute, RetrieveThing,
};
use crate::thing::{
    attribute_path, checked, feature_path, feature_property_path, read_feature_id, read_status,
    read_thing_id, validate_thing, write_status, ATTRIBUTE, FEATURE_ID, MERGE_STATUS, PATCH,
    PATCH_PATH, PROPERTY, THING, THING_ID, VALUE,
};
use twinwire_core::{
    ensure_root_object, BodyRule, EntityId, FieldDefinition, Headers, HttpStatus, JsonKey,
    JsonObject, JsonPointer, JsonReader, JsonWriter, MergeStatus, Signal, SignalCodec, SignalError,
    SizeGuard, StatusContract, Value, WithFeatureId,
};

const CREATED_VALUE: FieldDefinition = VALUE.optional();

response_status!(
    CreateThingResponse,
    RetrieveThingResponse,
    DeleteThingResponse,
    ModifyAttributeResponse,
    RetrieveAttributeResponse,
    DeleteAttributeResponse,
    ModifyFeaturePropertyResponse,
    DeleteFeatureResponse,
    MergeThingResponse,
);

/// Value of an optional payload field; an explicit `null` is a present value
fn read_created_value(reader: &JsonReader<'_>) -> Result<Option<Value>, SignalError> {
    Ok(reader.get(&CREATED_VALUE)?.cloned())
}

/// Response to [`CreateThing`], carrying the created thing
#[derive(Debug, Clone, PartialEq)]
pub struct CreateThingResponse {
    entity_id: EntityId,
    thing: Value,
    status: HttpStatus,
    headers: Headers,
}

envelope!(CreateThingResponse, CommandResponse, "things.responses", "createThing");

impl CreateThingResponse {
    pub const CONTRACT: StatusContract =
        StatusContract::new(Self::TYPE, &[(HttpStatus::CREATED, BodyRule::Required)]);

    pub fn new(
        entity_id: EntityId,
        thing: Value,
        status: HttpStatus,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        let status = Self::CONTRACT.validate(status, true)?;
        validate_thing(&entity_id, &thing)?;
        Ok(Self {
            entity_id,
            thing,
            status,
            headers,
        })
    }

    pub fn for_command(command: &CreateThing) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.thing().clone(),
            HttpStatus::CREATED,
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

impl SignalCodec for CreateThingResponse {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&THING, self.thing.clone());
        write_status(out, self.status);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.value(&THING)?.clone(),
            read_status(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Response to [`RetrieveThing`], carrying the (possibly partial) thing
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveThingResponse {
    entity_id: EntityId,
    thing: Value,
    status: HttpStatus,
    headers: Headers,
}

envelope!(RetrieveThingResponse, CommandResponse, "things.responses", "retrieveThing");

impl RetrieveThingResponse {
    pub const CONTRACT: StatusContract =
        StatusContract::new(Self::TYPE, &[(HttpStatus::OK, BodyRule::Required)]);

    pub fn new(
        entity_id: EntityId,
        thing: Value,
        status: HttpStatus,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        let status = Self::CONTRACT.validate(status, true)?;
        validate_thing(&entity_id, &thing)?;
        Ok(Self {
            entity_id,
            thing,
            status,
            headers,
        })
    }

    pub fn for_command(command: &RetrieveThing, thing: Value) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            thing,
            HttpStatus::OK,
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

impl SignalCodec for RetrieveThingResponse {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&THING, self.thing.clone());
        write_status(out, self.status);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.value(&THING)?.clone(),
            read_status(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Response to [`DeleteThing`]
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteThingResponse {
    entity_id: EntityId,
    status: HttpStatus,
    headers: Headers,
}

envelope!(DeleteThingResponse, CommandResponse, "things.responses", "deleteThing");

impl DeleteThingResponse {
    pub const CONTRACT: StatusContract =
        StatusContract::new(Self::TYPE, &[(HttpStatus::NO_CONTENT, BodyRule::Forbidden)]);

    pub fn new(entity_id: EntityId, status: HttpStatus, headers: Headers) -> Result<Self, SignalError> {
        Ok(Self {
            entity_id,
            status: Self::CONTRACT.validate(status, false)?,
            headers,
        })
    }

    pub fn for_command(command: &DeleteThing) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            HttpStatus::NO_CONTENT,
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

impl SignalCodec for DeleteThingResponse {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        write_status(out, self.status);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(read_thing_id(&reader)?, read_status(&reader)?, headers.clone())?;
        checked(&reader, signal)
    }
}

/// Response to [`ModifyAttribute`]: `201` with the created value, or `204`
/// without a body when an existing attribute was replaced
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyAttributeResponse {
    entity_id: EntityId,
    attribute: JsonPointer,
    value: Option<Value>,
    status: HttpStatus,
    headers: Headers,
}

envelope!(ModifyAttributeResponse, CommandResponse, "things.responses", "modifyAttribute");

impl ModifyAttributeResponse {
    pub const CONTRACT: StatusContract = StatusContract::new(
        Self::TYPE,
        &[
            (HttpStatus::CREATED, BodyRule::Required),
            (HttpStatus::NO_CONTENT, BodyRule::Forbidden),
        ],
    );

    pub fn new(
        entity_id: EntityId,
        attribute: JsonPointer,
        value: Option<Value>,
        status: HttpStatus,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        let status = Self::CONTRACT.validate(status, value.is_some())?;
        let attribute = attribute.require_non_empty("modifyAttributeResponse")?;
        if let Some(value) = &value {
            SizeGuard::current().check(value)?;
        }
        Ok(Self {
            entity_id,
            attribute,
            value,
            status,
            headers,
        })
    }

    /// The attribute did not exist before
    pub fn created(command: &ModifyAttribute) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.attribute().clone(),
            Some(command.value().clone()),
            HttpStatus::CREATED,
            command.headers().clone(),
        )
    }

    /// An existing attribute was replaced
    pub fn modified(command: &ModifyAttribute) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.attribute().clone(),
            None,
            HttpStatus::NO_CONTENT,
            command.headers().clone(),
        )
    }

    pub fn attribute(&self) -> &JsonPointer {
        &self.attribute
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    fn resource(&self) -> JsonPointer {
        attribute_path(&self.attribute)
    }

    fn body(&self) -> Option<Value> {
        self.value.clone()
    }
}

impl SignalCodec for ModifyAttributeResponse {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&ATTRIBUTE, self.attribute.to_string());
        out.set_opt(&CREATED_VALUE, self.value.clone());
        write_status(out, self.status);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.pointer(&ATTRIBUTE)?,
            read_created_value(&reader)?,
            read_status(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Response to [`RetrieveAttribute`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveAttributeResponse {
    entity_id: EntityId,
    attribute: JsonPointer,
    value: Value,
    status: HttpStatus,
    headers: Headers,
}

envelope!(RetrieveAttributeResponse, CommandResponse, "things.responses", "retrieveAttribute");

impl RetrieveAttributeResponse {
    pub const CONTRACT: StatusContract =
        StatusContract::new(Self::TYPE, &[(HttpStatus::OK, BodyRule::Required)]);

    pub fn new(
        entity_id: EntityId,
        attribute: JsonPointer,
        value: Value,
        status: HttpStatus,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        let status = Self::CONTRACT.validate(status, true)?;
        let attribute = attribute.require_non_empty("retrieveAttributeResponse")?;
        SizeGuard::current().check(&value)?;
        Ok(Self {
            entity_id,
            attribute,
            value,
            status,
            headers,
        })
    }

    pub fn for_command(command: &RetrieveAttribute, value: Value) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.attribute().clone(),
            value,
            HttpStatus::OK,
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

impl SignalCodec for RetrieveAttributeResponse {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&ATTRIBUTE, self.attribute.to_string());
        out.set(&VALUE, self.value.clone());
        write_status(out, self.status);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.pointer(&ATTRIBUTE)?,
            reader.value(&VALUE)?.clone(),
            read_status(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Response to [`DeleteAttribute`]
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAttributeResponse {
    entity_id: EntityId,
    attribute: JsonPointer,
    status: HttpStatus,
    headers: Headers,
}

envelope!(DeleteAttributeResponse, CommandResponse, "things.responses", "deleteAttribute");

impl DeleteAttributeResponse {
    pub const CONTRACT: StatusContract =
        StatusContract::new(Self::TYPE, &[(HttpStatus::NO_CONTENT, BodyRule::Forbidden)]);

    pub fn new(
        entity_id: EntityId,
        attribute: JsonPointer,
        status: HttpStatus,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            status: Self::CONTRACT.validate(status, false)?,
            attribute: attribute.require_non_empty("deleteAttributeResponse")?,
            entity_id,
            headers,
        })
    }

    pub fn for_command(command: &DeleteAttribute) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.attribute().clone(),
            HttpStatus::NO_CONTENT,
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

impl SignalCodec for DeleteAttributeResponse {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&ATTRIBUTE, self.attribute.to_string());
        write_status(out, self.status);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.pointer(&ATTRIBUTE)?,
            read_status(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Response to [`ModifyFeatureProperty`]: `201` with the created value or `204`
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyFeaturePropertyResponse {
    entity_id: EntityId,
    feature_id: JsonKey,
    property: JsonPointer,
    value: Option<Value>,
    status: HttpStatus,
    headers: Headers,
}

envelope!(
    ModifyFeaturePropertyResponse,
    CommandResponse,
    "things.responses",
    "modifyFeatureProperty"
);
feature_scoped!(ModifyFeaturePropertyResponse);

impl ModifyFeaturePropertyResponse {
    pub const CONTRACT: StatusContract = StatusContract::new(
        Self::TYPE,
        &[
            (HttpStatus::CREATED, BodyRule::Required),
            (HttpStatus::NO_CONTENT, BodyRule::Forbidden),
        ],
    );

    pub fn new(
        entity_id: EntityId,
        feature_id: JsonKey,
        property: JsonPointer,
        value: Option<Value>,
        status: HttpStatus,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        let status = Self::CONTRACT.validate(status, value.is_some())?;
        let property = property.require_non_empty("modifyFeaturePropertyResponse")?;
        if let Some(value) = &value {
            SizeGuard::current().check(value)?;
        }
        Ok(Self {
            entity_id,
            feature_id,
            property,
            value,
            status,
            headers,
        })
    }

    pub fn created(command: &ModifyFeatureProperty) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.feature_id().clone(),
            command.property().clone(),
            Some(command.value().clone()),
            HttpStatus::CREATED,
            command.headers().clone(),
        )
    }

    pub fn modified(command: &ModifyFeatureProperty) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.feature_id().clone(),
            command.property().clone(),
            None,
            HttpStatus::NO_CONTENT,
            command.headers().clone(),
        )
    }

    pub fn property(&self) -> &JsonPointer {
        &self.property
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    fn resource(&self) -> JsonPointer {
        feature_property_path(&self.feature_id, &self.property)
    }

    fn body(&self) -> Option<Value> {
        self.value.clone()
    }
}

impl SignalCodec for ModifyFeaturePropertyResponse {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&FEATURE_ID, self.feature_id.to_string());
        out.set(&PROPERTY, self.property.to_string());
        out.set_opt(&CREATED_VALUE, self.value.clone());
        write_status(out, self.status);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            read_feature_id(&reader)?,
            reader.pointer(&PROPERTY)?,
            read_created_value(&reader)?,
            read_status(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Response to [`DeleteFeature`]
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteFeatureResponse {
    entity_id: EntityId,
    feature_id: JsonKey,
    status: HttpStatus,
    headers: Headers,
}

envelope!(DeleteFeatureResponse, CommandResponse, "things.responses", "deleteFeature");
feature_scoped!(DeleteFeatureResponse);

impl DeleteFeatureResponse {
    pub const CONTRACT: StatusContract =
        StatusContract::new(Self::TYPE, &[(HttpStatus::NO_CONTENT, BodyRule::Forbidden)]);

    pub fn new(
        entity_id: EntityId,
        feature_id: JsonKey,
        status: HttpStatus,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            status: Self::CONTRACT.validate(status, false)?,
            entity_id,
            feature_id,
            headers,
        })
    }

    pub fn for_command(command: &DeleteFeature) -> Result<Self, SignalError> {
        Self::new(
            command.entity_id().clone(),
            command.feature_id().clone(),
            HttpStatus::NO_CONTENT,
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

impl SignalCodec for DeleteFeatureResponse {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&FEATURE_ID, self.feature_id.to_string());
        write_status(out, self.status);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            read_feature_id(&reader)?,
            read_status(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}

/// Response to [`MergeThing`], echoing the patch that was (or would be) applied
#[derive(Debug, Clone, PartialEq)]
pub struct MergeThingResponse {
    entity_id: EntityId,
    path: JsonPointer,
    patch: Value,
    merge_status: MergeStatus,
    status: HttpStatus,
    headers: Headers,
}

envelope!(MergeThingResponse, CommandResponse, "things.responses", "mergeThing");

impl MergeThingResponse {
    pub const CONTRACT: StatusContract = StatusContract::new(
        Self::TYPE,
        &[
            (HttpStatus::OK, BodyRule::Required),
            (HttpStatus::ACCEPTED, BodyRule::Required),
        ],
    );

    /// The status must be the one `merge_status` implies
    pub fn new(
        entity_id: EntityId,
        path: JsonPointer,
        patch: Value,
        merge_status: MergeStatus,
        status: HttpStatus,
        headers: Headers,
    ) -> Result<Self, SignalError> {
        let status = Self::CONTRACT.validate(status, true)?;
        if status != merge_status.http_status() {
            return Err(SignalError::StatusContradiction {
                signal: Self::TYPE,
                status,
                reason: format!(
                    "merge status {merge_status} implies {}",
                    merge_status.http_status()
                ),
            });
        }
        ensure_root_object(&path, &patch)?;
        SizeGuard::current().check(&patch)?;
        Ok(Self {
            entity_id,
            path,
            patch,
            merge_status,
            status,
            headers,
        })
    }

    /// `DryRun` when the command asked for a dry run, else `Applied`
    pub fn for_command(command: &MergeThing) -> Result<Self, SignalError> {
        let merge_status = if command.headers().dry_run() {
            MergeStatus::DryRun
        } else {
            MergeStatus::Applied
        };
        Self::new(
            command.entity_id().clone(),
            command.patch().path().clone(),
            command.patch().value().clone(),
            merge_status,
            merge_status.http_status(),
            command.headers().clone(),
        )
    }

    pub fn path(&self) -> &JsonPointer {
        &self.path
    }

    pub fn patch(&self) -> &Value {
        &self.patch
    }

    pub fn merge_status(&self) -> MergeStatus {
        self.merge_status
    }

    fn resource(&self) -> JsonPointer {
        self.path.clone()
    }

    fn body(&self) -> Option<Value> {
        Some(self.patch.clone())
    }
}

impl SignalCodec for MergeThingResponse {
    fn write_fields(&self, out: &mut JsonWriter) {
        out.set(&THING_ID, self.entity_id.to_string());
        out.set(&PATCH_PATH, self.path.to_string());
        out.set(&PATCH, self.patch.clone());
        out.set(&MERGE_STATUS, self.merge_status.as_str());
        write_status(out, self.status);
    }

    fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
        let reader = JsonReader::for_headers(object, headers)?;
        let signal = Self::new(
            read_thing_id(&reader)?,
            reader.pointer(&PATCH_PATH)?,
            reader.value(&PATCH)?.clone(),
            reader.required::<MergeStatus>(&MERGE_STATUS)?,
            read_status(&reader)?,
            headers.clone(),
        )?;
        checked(&reader, signal)
    }
}
