//! The closed union of every signal this crate defines, and its registry
//!
//! `TwinSignal`, `SignalKind` and the registration table are generated from
//! one list, so a variant cannot be added to the union without also being
//! registered.

use crate::commands::*;
use crate::connectivity::*;
use crate::events::*;
use crate::responses::*;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use tracing::info;
use twinwire_core::{
    CommandResponse, DecodeFn, EntityId, FieldPredicate, Headers, HttpStatus, JsonObject,
    JsonPointer, JsonWriter, Registry, SchemaVersion, Signal, SignalCategory, SignalCodec,
    SignalError, Value, WithRevision, WithTimestamp,
};

fn decode_as<S>(object: &JsonObject, headers: &Headers) -> Result<TwinSignal, SignalError>
where
    S: SignalCodec + Into<TwinSignal>,
{
    S::decode(object, headers).map(Into::into)
}

macro_rules! signal_catalog {
    (
        commands: [$($command:ident),+ $(,)?],
        responses: [$($response:ident),+ $(,)?],
        revisioned_events: [$($revisioned:ident),+ $(,)?],
        events: [$($event:ident),+ $(,)?] $(,)?
    ) => {
        /// Any signal of the catalog
        #[derive(Debug, Clone, PartialEq)]
        pub enum TwinSignal {
            $($command($command),)+
            $($response($response),)+
            $($revisioned($revisioned),)+
            $($event($event),)+
        }

        /// Discriminant of [`TwinSignal`]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum SignalKind {
            $($command,)+
            $($response,)+
            $($revisioned,)+
            $($event,)+
        }

        impl SignalKind {
            pub const ALL: &'static [SignalKind] = &[
                $(SignalKind::$command,)+
                $(SignalKind::$response,)+
                $(SignalKind::$revisioned,)+
                $(SignalKind::$event,)+
            ];

            pub fn type_tag(self) -> &'static str {
                match self {
                    $(Self::$command => $command::TYPE,)+
                    $(Self::$response => $response::TYPE,)+
                    $(Self::$revisioned => $revisioned::TYPE,)+
                    $(Self::$event => $event::TYPE,)+
                }
            }

            pub fn category(self) -> SignalCategory {
                match self {
                    $(Self::$command => SignalCategory::Command,)+
                    $(Self::$response => SignalCategory::CommandResponse,)+
                    $(Self::$revisioned => SignalCategory::Event,)+
                    $(Self::$event => SignalCategory::Event,)+
                }
            }

            fn decoder(self) -> DecodeFn<TwinSignal> {
                match self {
                    $(Self::$command => decode_as::<$command> as DecodeFn<TwinSignal>,)+
                    $(Self::$response => decode_as::<$response> as DecodeFn<TwinSignal>,)+
                    $(Self::$revisioned => decode_as::<$revisioned> as DecodeFn<TwinSignal>,)+
                    $(Self::$event => decode_as::<$event> as DecodeFn<TwinSignal>,)+
                }
            }
        }

        $(
            impl From<$command> for TwinSignal {
                fn from(signal: $command) -> Self {
                    Self::$command(signal)
                }
            }
        )+
        $(
            impl From<$response> for TwinSignal {
                fn from(signal: $response) -> Self {
                    Self::$response(signal)
                }
            }
        )+
        $(
            impl From<$revisioned> for TwinSignal {
                fn from(signal: $revisioned) -> Self {
                    Self::$revisioned(signal)
                }
            }
        )+
        $(
            impl From<$event> for TwinSignal {
                fn from(signal: $event) -> Self {
                    Self::$event(signal)
                }
            }
        )+

        impl TwinSignal {
            pub fn kind(&self) -> SignalKind {
                match self {
                    $(Self::$command(_) => SignalKind::$command,)+
                    $(Self::$response(_) => SignalKind::$response,)+
                    $(Self::$revisioned(_) => SignalKind::$revisioned,)+
                    $(Self::$event(_) => SignalKind::$event,)+
                }
            }

            /// Status of a command response; `None` for other signals
            pub fn http_status(&self) -> Option<HttpStatus> {
                match self {
                    $(Self::$response(s) => Some(s.http_status()),)+
                    _ => None,
                }
            }

            /// Revision of an event that has one
            pub fn revision(&self) -> Option<u64> {
                match self {
                    $(Self::$revisioned(s) => Some(s.revision()),)+
                    _ => None,
                }
            }

            pub fn timestamp(&self) -> Option<DateTime<Utc>> {
                match self {
                    $(Self::$revisioned(s) => s.timestamp(),)+
                    $(Self::$event(s) => s.timestamp(),)+
                    _ => None,
                }
            }
        }

        impl Signal for TwinSignal {
            fn type_tag(&self) -> &'static str {
                self.kind().type_tag()
            }

            fn category(&self) -> SignalCategory {
                self.kind().category()
            }

            fn entity_id(&self) -> &EntityId {
                match self {
                    $(Self::$command(s) => s.entity_id(),)+
                    $(Self::$response(s) => s.entity_id(),)+
                    $(Self::$revisioned(s) => s.entity_id(),)+
                    $(Self::$event(s) => s.entity_id(),)+
                }
            }

            fn resource_path(&self) -> JsonPointer {
                match self {
                    $(Self::$command(s) => s.resource_path(),)+
                    $(Self::$response(s) => s.resource_path(),)+
                    $(Self::$revisioned(s) => s.resource_path(),)+
                    $(Self::$event(s) => s.resource_path(),)+
                }
            }

            fn headers(&self) -> &Headers {
                match self {
                    $(Self::$command(s) => s.headers(),)+
                    $(Self::$response(s) => s.headers(),)+
                    $(Self::$revisioned(s) => s.headers(),)+
                    $(Self::$event(s) => s.headers(),)+
                }
            }

            fn with_headers(&self, headers: Headers) -> Self {
                match self {
                    $(Self::$command(s) => Self::$command(s.with_headers(headers)),)+
                    $(Self::$response(s) => Self::$response(s.with_headers(headers)),)+
                    $(Self::$revisioned(s) => Self::$revisioned(s.with_headers(headers)),)+
                    $(Self::$event(s) => Self::$event(s.with_headers(headers)),)+
                }
            }

            fn payload(&self) -> Option<Value> {
                match self {
                    $(Self::$command(s) => s.payload(),)+
                    $(Self::$response(s) => s.payload(),)+
                    $(Self::$revisioned(s) => s.payload(),)+
                    $(Self::$event(s) => s.payload(),)+
                }
            }
        }

        impl SignalCodec for TwinSignal {
            fn write_fields(&self, out: &mut JsonWriter) {
                match self {
                    $(Self::$command(s) => s.write_fields(out),)+
                    $(Self::$response(s) => s.write_fields(out),)+
                    $(Self::$revisioned(s) => s.write_fields(out),)+
                    $(Self::$event(s) => s.write_fields(out),)+
                }
            }

            fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
                registry().decode(object, headers)
            }
        }
    };
}

signal_catalog! {
    commands: [
        CreateThing,
        RetrieveThing,
        DeleteThing,
        ModifyAttribute,
        RetrieveAttribute,
        DeleteAttribute,
        ModifyFeatureProperty,
        DeleteFeature,
        MergeThing,
        OpenConnection,
        CloseConnection,
    ],
    responses: [
        CreateThingResponse,
        RetrieveThingResponse,
        DeleteThingResponse,
        ModifyAttributeResponse,
        RetrieveAttributeResponse,
        DeleteAttributeResponse,
        ModifyFeaturePropertyResponse,
        DeleteFeatureResponse,
        MergeThingResponse,
        OpenConnectionResponse,
        CloseConnectionResponse,
    ],
    revisioned_events: [
        ThingCreated,
        ThingDeleted,
        AttributeCreated,
        AttributeModified,
        AttributeDeleted,
        FeaturePropertyModified,
        FeatureDeleted,
        ThingMerged,
    ],
    events: [
        ConnectionOpened,
        ConnectionClosed,
    ],
}

static REGISTRY: Lazy<Registry<TwinSignal>> = Lazy::new(|| {
    let entries = SignalKind::ALL
        .iter()
        .map(|kind| (kind.type_tag(), kind.decoder()));
    match Registry::build(entries) {
        Ok(registry) => {
            info!(types = registry.len(), "signal registry built");
            registry
        }
        Err(e) => panic!("signal catalog is inconsistent: {e}"),
    }
});

/// The process-wide registry of every catalog signal
pub fn registry() -> &'static Registry<TwinSignal> {
    &REGISTRY
}

/// Decode a wire object into whichever signal its `type` names
pub fn decode(object: &JsonObject, headers: &Headers) -> Result<TwinSignal, SignalError> {
    registry().decode(object, headers)
}

/// Parse and decode a JSON text
pub fn decode_str(json: &str, headers: &Headers) -> Result<TwinSignal, SignalError> {
    registry().decode_str(json, headers)
}

/// Render any signal at `version`, keeping the fields `predicate` accepts
pub fn encode<S: SignalCodec>(
    signal: &S,
    version: SchemaVersion,
    predicate: &FieldPredicate,
) -> JsonObject {
    twinwire_core::encode(signal, version, predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_kind_is_registered() {
        assert_eq!(registry().len(), SignalKind::ALL.len());
        for kind in SignalKind::ALL {
            assert!(registry().contains(kind.type_tag()), "{kind:?}");
        }
    }

    #[test]
    fn test_type_tags_follow_category() {
        for kind in SignalKind::ALL {
            let tag = kind.type_tag();
            let expected = match kind.category() {
                SignalCategory::Command => ".commands.",
                SignalCategory::CommandResponse => ".responses.",
                SignalCategory::Event => ".events.",
            };
            assert!(tag.contains(expected), "{tag}");
        }
    }

    #[test]
    fn test_union_delegates() {
        let cmd = DeleteThing::new(EntityId::thing("ns:t").unwrap(), Headers::new());
        let signal = TwinSignal::from(cmd.clone());
        assert_eq!(signal.kind(), SignalKind::DeleteThing);
        assert_eq!(signal.type_tag(), DeleteThing::TYPE);
        assert_eq!(signal.entity_id(), cmd.entity_id());
        assert_eq!(signal.http_status(), None);
        assert_eq!(signal.revision(), None);

        let wire = encode(&signal, SchemaVersion::V2, &FieldPredicate::always());
        assert_eq!(wire, encode(&cmd, SchemaVersion::V2, &FieldPredicate::always()));
        assert_eq!(TwinSignal::decode(&wire, &Headers::new()).unwrap(), signal);
    }

    #[test]
    fn test_decode_str_entry_point() {
        let signal = decode_str(
            r#"{"type":"things.commands.retrieveAttribute","thingId":"ns:t","attribute":"/color"}"#,
            &Headers::new(),
        )
        .unwrap();
        assert_eq!(signal.resource_path().to_string(), "/attributes/color");
        assert!(matches!(
            decode(json!({"type": "things.commands.nope"}).as_object().unwrap(), &Headers::new()),
            Err(SignalError::UnknownType { .. })
        ));
    }
}
