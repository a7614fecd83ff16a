//! Error kinds surfaced by the signal protocol
//!
//! All errors are values returned synchronously to the immediate caller.
//! Nothing in this crate retries or recovers.

use crate::status::HttpStatus;
use crate::version::SchemaVersion;
use thiserror::Error;

/// Construction-time validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("entity id '{id}' is invalid: {reason}")]
    InvalidEntityId { id: String, reason: String },

    #[error("pointer '{pointer}' is invalid: {reason}")]
    InvalidPointer { pointer: String, reason: String },

    #[error("{context} requires a non-empty pointer")]
    EmptyPointer { context: &'static str },

    #[error("key '{key}' is invalid: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("header '{key}' has invalid value '{value}'")]
    InvalidHeader { key: String, value: String },

    #[error("{context} must be a JSON object")]
    NotAnObject { context: &'static str },
}

/// Failures while reconstructing a signal from its wire form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("input is not valid JSON: {0}")]
    Malformed(String),

    #[error("signal must be a JSON object")]
    NotAnObject,

    #[error("required field '{field}' is missing at schema version {version}")]
    MissingField {
        field: &'static str,
        version: SchemaVersion,
    },

    #[error("field '{field}' has the wrong shape: {detail}")]
    WrongShape { field: &'static str, detail: String },

    #[error("field '{field}' is '{found}' but the signal implies '{expected}'")]
    Inconsistent {
        field: &'static str,
        expected: String,
        found: String,
    },
}

/// Registry construction failures, raised once at startup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("type '{0}' is registered more than once")]
    DuplicateType(String),

    #[error("type '{0}' is not of the form '<prefix>.<name>'")]
    MalformedType(String),
}

/// Configuration loading failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("environment variable {var} has invalid value '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    #[error("configuration is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("protocol configuration was already installed")]
    AlreadyInstalled,
}

/// Umbrella error returned by signal construction, encoding and dispatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("unknown signal type '{type_tag}'")]
    UnknownType { type_tag: String },

    #[error("status {status} contradicts {signal}: {reason}")]
    StatusContradiction {
        signal: &'static str,
        status: HttpStatus,
        reason: String,
    },

    #[error("payload of ~{size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("merge patch at '{path}' is a no-op")]
    MergePatchNoOp { path: String },
}

impl SignalError {
    /// True for the dedicated invalid-key validation failure
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, Self::Validation(ValidationError::InvalidKey { .. }))
    }
}

pub type Result<T, E = SignalError> = std::result::Result<T, E>;
