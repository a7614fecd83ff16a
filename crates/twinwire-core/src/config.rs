//! Protocol configuration
//!
//! Installed once per process; readers that run before installation see the
//! defaults.

use crate::error::ConfigError;
use crate::version::SchemaVersion;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const ENV_MAX_PAYLOAD_BYTES: &str = "TWINWIRE_MAX_PAYLOAD_BYTES";
pub const ENV_SCHEMA_VERSION: &str = "TWINWIRE_SCHEMA_VERSION";
pub const ENV_STRICT_NO_OP_MERGE: &str = "TWINWIRE_STRICT_NO_OP_MERGE";

static INSTALLED: OnceCell<ProtocolConfig> = OnceCell::new();
static DEFAULT: OnceCell<ProtocolConfig> = OnceCell::new();

/// Configuration for signal construction and decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Upper bound on the estimated serialized size of a payload
    pub max_payload_bytes: usize,

    /// Version used to decode when the headers request none
    pub default_schema_version: SchemaVersion,

    /// Reject empty root merge patches under strict schema versions
    pub strict_no_op_merge: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 100 * 1024,
            default_schema_version: SchemaVersion::LATEST,
            strict_no_op_merge: true,
        }
    }
}

impl ProtocolConfig {
    /// Defaults overridden by `TWINWIRE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns per variable name
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_MAX_PAYLOAD_BYTES) {
            config.max_payload_bytes = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_MAX_PAYLOAD_BYTES,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_SCHEMA_VERSION) {
            config.default_schema_version = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_SCHEMA_VERSION,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_STRICT_NO_OP_MERGE) {
            config.strict_no_op_merge = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_STRICT_NO_OP_MERGE,
                value: raw.clone(),
            })?;
        }
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidJson(e.to_string()))
    }

    /// Install as the process-wide configuration. Only the first call wins.
    pub fn install(self) -> Result<&'static ProtocolConfig, ConfigError> {
        let mut fresh = false;
        let installed = INSTALLED.get_or_init(|| {
            fresh = true;
            self
        });
        if !fresh {
            return Err(ConfigError::AlreadyInstalled);
        }
        info!(
            max_payload_bytes = installed.max_payload_bytes,
            default_schema_version = %installed.default_schema_version,
            "protocol configuration installed"
        );
        Ok(installed)
    }

    /// Installed configuration, or the defaults when none was installed
    pub fn current() -> &'static ProtocolConfig {
        INSTALLED
            .get()
            .unwrap_or_else(|| DEFAULT.get_or_init(ProtocolConfig::default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ProtocolConfig::default();
        assert_eq!(config.max_payload_bytes, 102_400);
        assert_eq!(config.default_schema_version, SchemaVersion::V2);
        assert!(config.strict_no_op_merge);
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            (ENV_MAX_PAYLOAD_BYTES, "2048"),
            (ENV_SCHEMA_VERSION, "1"),
            (ENV_STRICT_NO_OP_MERGE, "false"),
        ]
        .into_iter()
        .collect();
        let config = ProtocolConfig::from_lookup(|var| env.get(var).map(|v| v.to_string())).unwrap();
        assert_eq!(config.max_payload_bytes, 2048);
        assert_eq!(config.default_schema_version, SchemaVersion::V1);
        assert!(!config.strict_no_op_merge);
    }

    #[test]
    fn test_invalid_env() {
        let err = ProtocolConfig::from_lookup(|var| {
            (var == ENV_MAX_PAYLOAD_BYTES).then(|| "lots".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                var: ENV_MAX_PAYLOAD_BYTES,
                value: "lots".to_string()
            }
        );
    }

    #[test]
    fn test_from_json_partial() {
        let config = ProtocolConfig::from_json_str(r#"{"max_payload_bytes": 10}"#).unwrap();
        assert_eq!(config.max_payload_bytes, 10);
        assert_eq!(config.default_schema_version, SchemaVersion::V2);
        assert!(ProtocolConfig::from_json_str("[").is_err());
    }
}
