//! TwinWire Things
//!
//! The concrete signal catalog for things and connections:
//! - Thing commands, their responses and the events they produce
//! - Connection lifecycle commands, responses and events
//! - The closed `TwinSignal` union and its process-wide registry

#[macro_use]
mod macros;

pub mod catalog;
pub mod commands;
pub mod connectivity;
pub mod events;
pub mod responses;
pub mod thing;

pub use catalog::{decode, decode_str, encode, registry, SignalKind, TwinSignal};
pub use commands::{
    CreateThing, DeleteAttribute, DeleteFeature, DeleteThing, MergeThing, ModifyAttribute,
    ModifyFeatureProperty, RetrieveAttribute, RetrieveThing,
};
pub use connectivity::{
    CloseConnection, CloseConnectionResponse, ConnectionClosed, ConnectionOpened, OpenConnection,
    OpenConnectionResponse,
};
pub use events::{
    AttributeCreated, AttributeDeleted, AttributeModified, FeatureDeleted,
    FeaturePropertyModified, ThingCreated, ThingDeleted, ThingMerged,
};
pub use responses::{
    CreateThingResponse, DeleteAttributeResponse, DeleteFeatureResponse, DeleteThingResponse,
    MergeThingResponse, ModifyAttributeResponse, ModifyFeaturePropertyResponse,
    RetrieveAttributeResponse, RetrieveThingResponse,
};
