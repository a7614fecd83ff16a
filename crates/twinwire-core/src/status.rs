//! Admissible response statuses
//!
//! Each response variant declares a `StatusContract` constant: the statuses it
//! may carry and, per status, whether a body is required, forbidden or free.
//! Construction runs every status through the contract so a response can never
//! represent an impossible outcome.

use crate::error::SignalError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP status code carried by command responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct HttpStatus(u16);

impl HttpStatus {
    pub const OK: Self = Self(200);
    pub const CREATED: Self = Self(201);
    pub const ACCEPTED: Self = Self(202);
    pub const NO_CONTENT: Self = Self(204);
    pub const BAD_REQUEST: Self = Self(400);
    pub const NOT_FOUND: Self = Self(404);
    pub const PRECONDITION_FAILED: Self = Self(412);
    pub const PAYLOAD_TOO_LARGE: Self = Self(413);

    pub const fn new(code: u16) -> Option<Self> {
        if code >= 100 && code <= 599 {
            Some(Self(code))
        } else {
            None
        }
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<HttpStatus> for u16 {
    fn from(status: HttpStatus) -> Self {
        status.0
    }
}

impl TryFrom<u16> for HttpStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::new(code).ok_or_else(|| format!("{code} is not an HTTP status code"))
    }
}

/// Payload rule attached to one admissible status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRule {
    Any,
    Required,
    Forbidden,
}

/// Fixed, non-empty set of admissible statuses for one response variant
#[derive(Debug, Clone, Copy)]
pub struct StatusContract {
    signal: &'static str,
    rules: &'static [(HttpStatus, BodyRule)],
}

impl StatusContract {
    /// Panics during const evaluation when `rules` is empty, so an empty
    /// contract declared as a `const` fails the build.
    pub const fn new(signal: &'static str, rules: &'static [(HttpStatus, BodyRule)]) -> Self {
        assert!(!rules.is_empty(), "status contract must admit at least one status");
        Self { signal, rules }
    }

    pub fn signal(&self) -> &'static str {
        self.signal
    }

    pub fn admissible(&self) -> impl Iterator<Item = HttpStatus> + '_ {
        self.rules.iter().map(|(status, _)| *status)
    }

    pub fn admits(&self, status: HttpStatus) -> bool {
        self.rule_for(status).is_some()
    }

    fn rule_for(&self, status: HttpStatus) -> Option<BodyRule> {
        self.rules
            .iter()
            .find(|(candidate, _)| *candidate == status)
            .map(|(_, rule)| *rule)
    }

    /// Validate a status against the set and the presence of a body
    pub fn validate(&self, status: HttpStatus, has_body: bool) -> Result<HttpStatus, SignalError> {
        let contradiction = |reason: String| SignalError::StatusContradiction {
            signal: self.signal,
            status,
            reason,
        };
        match self.rule_for(status) {
            None => Err(contradiction(format!(
                "admissible statuses are {}",
                self.admissible()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
            Some(BodyRule::Required) if !has_body => {
                Err(contradiction("this status requires a payload".to_string()))
            }
            Some(BodyRule::Forbidden) if has_body => {
                Err(contradiction("this status must not carry a payload".to_string()))
            }
            Some(_) => Ok(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODIFY: StatusContract = StatusContract::new(
        "modifyAttribute",
        &[
            (HttpStatus::CREATED, BodyRule::Required),
            (HttpStatus::NO_CONTENT, BodyRule::Forbidden),
        ],
    );

    #[test]
    fn test_admissible_statuses() {
        assert!(MODIFY.admits(HttpStatus::CREATED));
        assert!(MODIFY.admits(HttpStatus::NO_CONTENT));
        assert!(!MODIFY.admits(HttpStatus::OK));
        assert_eq!(MODIFY.admissible().count(), 2);
    }

    #[test]
    fn test_validate_against_body() {
        assert_eq!(MODIFY.validate(HttpStatus::CREATED, true), Ok(HttpStatus::CREATED));
        assert_eq!(
            MODIFY.validate(HttpStatus::NO_CONTENT, false),
            Ok(HttpStatus::NO_CONTENT)
        );
        assert!(matches!(
            MODIFY.validate(HttpStatus::CREATED, false),
            Err(SignalError::StatusContradiction { .. })
        ));
        assert!(matches!(
            MODIFY.validate(HttpStatus::NO_CONTENT, true),
            Err(SignalError::StatusContradiction { .. })
        ));
        assert!(matches!(
            MODIFY.validate(HttpStatus::OK, false),
            Err(SignalError::StatusContradiction { .. })
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(HttpStatus::new(204), Some(HttpStatus::NO_CONTENT));
        assert_eq!(HttpStatus::new(42), None);
        assert!(HttpStatus::ACCEPTED.is_success());
        assert!(!HttpStatus::NOT_FOUND.is_success());
    }
}
