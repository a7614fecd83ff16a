//! Connection lifecycle signals
//!
//! Connections are addressed by their id alone; every signal acts on the root
//! path. Connection events carry no revision.

use crate::thing::{
    checked, read_connection_id, read_status, read_timestamp, write_status, write_timestamp,
    CONNECTION_ID,
};
use chrono::{DateTime, Utc};
use twinwire_core::{
    BodyRule, EntityId, Headers, HttpStatus, JsonObject, JsonPointer, JsonReader, JsonWriter,
    Signal, SignalCodec, SignalError, StatusContract, Value,
};

macro_rules! connection_command {
    ($(#[$doc:meta])* $ty:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $ty {
            entity_id: EntityId,
            headers: Headers,
        }

        envelope!($ty, Command, "connectivity.commands", $name);

        impl $ty {
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

        impl SignalCodec for $ty {
            fn write_fields(&self, out: &mut JsonWriter) {
                out.set(&CONNECTION_ID, self.entity_id.to_string());
            }

            fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
                let reader = JsonReader::for_headers(object, headers)?;
                checked(&reader, Self::new(read_connection_id(&reader)?, headers.clone()))
            }
        }
    };
}

macro_rules! connection_response {
    ($(#[$doc:meta])* $ty:ident, $command:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $ty {
            entity_id: EntityId,
            status: HttpStatus,
            headers: Headers,
        }

        envelope!($ty, CommandResponse, "connectivity.responses", $name);
        response_status!($ty);

        impl $ty {
            pub const CONTRACT: StatusContract =
                StatusContract::new(Self::TYPE, &[(HttpStatus::OK, BodyRule::Forbidden)]);

            pub fn new(
                entity_id: EntityId,
                status: HttpStatus,
                headers: Headers,
            ) -> Result<Self, SignalError> {
                Ok(Self {
                    entity_id,
                    status: Self::CONTRACT.validate(status, false)?,
                    headers,
                })
            }

            pub fn for_command(command: &$command) -> Result<Self, SignalError> {
                Self::new(
                    command.entity_id().clone(),
                    HttpStatus::OK,
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

        impl SignalCodec for $ty {
            fn write_fields(&self, out: &mut JsonWriter) {
                out.set(&CONNECTION_ID, self.entity_id.to_string());
                write_status(out, self.status);
            }

            fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
                let reader = JsonReader::for_headers(object, headers)?;
                let signal = Self::new(
                    read_connection_id(&reader)?,
                    read_status(&reader)?,
                    headers.clone(),
                )?;
                checked(&reader, signal)
            }
        }
    };
}

macro_rules! connection_event {
    ($(#[$doc:meta])* $ty:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $ty {
            entity_id: EntityId,
            timestamp: Option<DateTime<Utc>>,
            headers: Headers,
        }

        envelope!($ty, Event, "connectivity.events", $name);
        timestamped!($ty);

        impl $ty {
            pub fn new(
                entity_id: EntityId,
                timestamp: Option<DateTime<Utc>>,
                headers: Headers,
            ) -> Self {
                Self {
                    entity_id,
                    timestamp,
                    headers,
                }
            }

            fn resource(&self) -> JsonPointer {
                JsonPointer::root()
            }

            fn body(&self) -> Option<Value> {
                None
            }
        }

        impl SignalCodec for $ty {
            fn write_fields(&self, out: &mut JsonWriter) {
                out.set(&CONNECTION_ID, self.entity_id.to_string());
                write_timestamp(out, self.timestamp);
            }

            fn decode(object: &JsonObject, headers: &Headers) -> Result<Self, SignalError> {
                let reader = JsonReader::for_headers(object, headers)?;
                let signal = Self::new(
                    read_connection_id(&reader)?,
                    read_timestamp(&reader)?,
                    headers.clone(),
                );
                checked(&reader, signal)
            }
        }
    };
}

connection_command!(
    /// Open a connection
    OpenConnection,
    "openConnection"
);
connection_command!(
    /// Close a connection
    CloseConnection,
    "closeConnection"
);

connection_response!(OpenConnectionResponse, OpenConnection, "openConnection");
connection_response!(CloseConnectionResponse, CloseConnection, "closeConnection");

connection_event!(
    /// The connection is open
    ConnectionOpened,
    "connectionOpened"
);
connection_event!(
    /// The connection is closed
    ConnectionClosed,
    "connectionClosed"
);
