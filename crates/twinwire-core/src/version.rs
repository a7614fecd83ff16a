//! Schema versions gating which fields a signal exposes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered schema version of the wire representation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum SchemaVersion {
    V1,
    #[default]
    V2,
}

impl SchemaVersion {
    pub const LATEST: Self = Self::V2;
    pub const ALL: [Self; 2] = [Self::V1, Self::V2];

    /// Integer form used in headers and config
    pub fn as_u8(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            _ => None,
        }
    }

    /// Strict versions reject no-op merge patches at the document root
    pub fn is_strict(self) -> bool {
        self >= Self::V2
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl From<SchemaVersion> for u8 {
    fn from(version: SchemaVersion) -> Self {
        version.as_u8()
    }
}

impl TryFrom<u8> for SchemaVersion {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or_else(|| format!("unsupported schema version {value}"))
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        digits
            .parse::<u8>()
            .map_err(|_| format!("unsupported schema version '{s}'"))
            .and_then(Self::try_from)
    }
}
