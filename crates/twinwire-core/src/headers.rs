//! Cross-cutting signal context
//!
//! Headers travel next to the signal body and are passed through unchanged by
//! every transformation. Keys are case-insensitive and stored lower-case.

use crate::error::ValidationError;
use crate::version::SchemaVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const CORRELATION_ID: &str = "correlation-id";
pub const SCHEMA_VERSION: &str = "version";
pub const AUTH_SUBJECTS: &str = "auth-subjects";
pub const FEATURE_TOGGLES: &str = "feature-toggles";
pub const RESPONSE_REQUIRED: &str = "response-required";
pub const DRY_RUN: &str = "dry-run";
pub const CONDITION: &str = "condition";

/// Immutable string-to-string header bag
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// New headers with `key` set to `value`
    #[must_use]
    pub fn with(&self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        let mut map = self.0.clone();
        map.insert(key.as_ref().to_ascii_lowercase(), value.into());
        Self(map)
    }

    /// New headers without `key`
    #[must_use]
    pub fn without(&self, key: &str) -> Self {
        let mut map = self.0.clone();
        map.remove(&key.to_ascii_lowercase());
        Self(map)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.get(CORRELATION_ID)
    }

    #[must_use]
    pub fn with_correlation_id(&self, id: impl Into<String>) -> Self {
        self.with(CORRELATION_ID, id)
    }

    /// Keep an existing correlation id or assign a random one
    #[must_use]
    pub fn ensure_correlation_id(&self) -> Self {
        if self.correlation_id().is_some() {
            self.clone()
        } else {
            self.with_correlation_id(Uuid::new_v4().to_string())
        }
    }

    /// Requested schema version, if any
    pub fn schema_version(&self) -> Result<Option<SchemaVersion>, ValidationError> {
        self.get(SCHEMA_VERSION)
            .map(|raw| {
                raw.parse().map_err(|_| ValidationError::InvalidHeader {
                    key: SCHEMA_VERSION.to_string(),
                    value: raw.to_string(),
                })
            })
            .transpose()
    }

    #[must_use]
    pub fn with_schema_version(&self, version: SchemaVersion) -> Self {
        self.with(SCHEMA_VERSION, version.to_string())
    }

    pub fn auth_subjects(&self) -> Vec<&str> {
        self.list(AUTH_SUBJECTS)
    }

    #[must_use]
    pub fn with_auth_subjects<I, S>(&self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.with(AUTH_SUBJECTS, join(subjects))
    }

    pub fn feature_toggles(&self) -> Vec<&str> {
        self.list(FEATURE_TOGGLES)
    }

    pub fn is_feature_enabled(&self, toggle: &str) -> bool {
        self.feature_toggles().iter().any(|t| *t == toggle)
    }

    #[must_use]
    pub fn with_feature_toggles<I, S>(&self, toggles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.with(FEATURE_TOGGLES, join(toggles))
    }

    /// Defaults to true when absent
    pub fn response_required(&self) -> bool {
        self.flag(RESPONSE_REQUIRED).unwrap_or(true)
    }

    pub fn dry_run(&self) -> bool {
        self.flag(DRY_RUN).unwrap_or(false)
    }

    #[must_use]
    pub fn with_dry_run(&self, dry_run: bool) -> Self {
        self.with(DRY_RUN, dry_run.to_string())
    }

    /// Conditional-request expression, evaluated by downstream collaborators
    pub fn condition(&self) -> Option<&str> {
        self.get(CONDITION)
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn join<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl From<BTreeMap<String, String>> for Headers {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(
            map.into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
        )
    }
}

impl From<Headers> for BTreeMap<String, String> {
    fn from(headers: Headers) -> Self {
        headers.0
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
        )
    }
}
