//! Capability impls shared by the concrete signal structs
//!
//! Every struct carries `entity_id` and `headers` fields and an inherent
//! `resource()` / `body()` pair; these macros wire them into the core traits.

/// `Signal` impl plus the `TYPE` constant `<prefix>.<name>`
macro_rules! envelope {
    ($ty:ident, $category:ident, $prefix:literal, $name:literal) => {
        impl $ty {
            pub const TYPE: &'static str = concat!($prefix, ".", $name);
        }

        impl twinwire_core::Signal for $ty {
            fn type_tag(&self) -> &'static str {
                Self::TYPE
            }

            fn category(&self) -> twinwire_core::SignalCategory {
                twinwire_core::SignalCategory::$category
            }

            fn entity_id(&self) -> &twinwire_core::EntityId {
                &self.entity_id
            }

            fn resource_path(&self) -> twinwire_core::JsonPointer {
                self.resource()
            }

            fn headers(&self) -> &twinwire_core::Headers {
                &self.headers
            }

            fn with_headers(&self, headers: twinwire_core::Headers) -> Self {
                Self {
                    headers,
                    ..self.clone()
                }
            }

            fn payload(&self) -> Option<twinwire_core::Value> {
                self.body()
            }
        }
    };
}

/// `CommandResponse` impl reading the validated `status` field
macro_rules! response_status {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl twinwire_core::CommandResponse for $ty {
                fn http_status(&self) -> twinwire_core::HttpStatus {
                    self.status
                }
            }
        )+
    };
}

/// `WithTimestamp` impl reading the optional `timestamp` field
macro_rules! timestamped {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl twinwire_core::WithTimestamp for $ty {
                fn timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
                    self.timestamp
                }
            }
        )+
    };
}

/// `WithRevision` impl for events that carry a revision
macro_rules! revisioned {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl twinwire_core::WithRevision for $ty {
                fn revision(&self) -> u64 {
                    self.revision
                }

                fn with_revision(&self, revision: u64) -> Self {
                    Self {
                        revision,
                        ..self.clone()
                    }
                }
            }
        )+
    };
}

/// `WithFeatureId` impl for signals addressing one feature
macro_rules! feature_scoped {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl twinwire_core::WithFeatureId for $ty {
                fn feature_id(&self) -> &twinwire_core::JsonKey {
                    &self.feature_id
                }
            }
        )+
    };
}
