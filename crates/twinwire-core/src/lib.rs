//! TwinWire Core
//!
//! The generic signal protocol for digital twins:
//! - Validated entity ids, structural keys and JSON pointers
//! - Header context and schema-version-aware field visibility
//! - Versioned encode/decode of signal envelopes
//! - Type registry dispatching raw JSON to concrete variants
//! - Response status contracts
//! - RFC 7396 merge patches and payload guards

pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod field;
pub mod guard;
pub mod headers;
pub mod merge;
pub mod registry;
pub mod signal;
pub mod status;
pub mod value;
pub mod version;

pub use codec::{encode, JsonReader, JsonWriter, SignalCodec};
pub use config::ProtocolConfig;
pub use entity::{EntityId, EntityType};
pub use error::{ConfigError, DecodeError, RegistryError, SignalError, ValidationError};
pub use field::{FieldDefinition, FieldKind, FieldPredicate};
pub use guard::SizeGuard;
pub use headers::Headers;
pub use merge::{ensure_root_object, merge_patch, MergePatch, MergeStatus, PatchConditions};
pub use registry::{DecodeFn, Registry};
pub use signal::{
    CommandResponse, Signal, SignalCategory, WithFeatureId, WithRevision, WithTimestamp,
};
pub use status::{BodyRule, HttpStatus, StatusContract};
pub use value::{JsonKey, JsonObject, JsonPointer, Value};
pub use version::SchemaVersion;
