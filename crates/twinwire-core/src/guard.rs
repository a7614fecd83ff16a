//! Payload size and structural key guard
//!
//! Runs before a payload-bearing signal is accepted. Size is a structural
//! estimate of the compact JSON rendering computed without serializing.

use crate::config::ProtocolConfig;
use crate::error::SignalError;
use crate::value::{validate_keys, Value};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeGuard {
    limit: usize,
}

impl SizeGuard {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Guard using the process-wide protocol configuration
    pub fn current() -> Self {
        Self::from_config(ProtocolConfig::current())
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(config.max_payload_bytes)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Estimated size in bytes of the compact JSON rendering of `value`
    pub fn estimate(value: &Value) -> usize {
        match value {
            Value::Null => 4,
            Value::Bool(true) => 4,
            Value::Bool(false) => 5,
            Value::Number(n) => n.to_string().len(),
            Value::String(s) => string_size(s),
            Value::Array(items) => {
                2 + items.iter().map(Self::estimate).sum::<usize>() + items.len().saturating_sub(1)
            }
            Value::Object(map) => {
                2 + map
                    .iter()
                    .map(|(k, v)| string_size(k) + 1 + Self::estimate(v))
                    .sum::<usize>()
                    + map.len().saturating_sub(1)
            }
        }
    }

    /// Accept payloads whose estimate is at most the limit
    pub fn check_size(&self, value: &Value) -> Result<usize, SignalError> {
        self.check_estimate(Self::estimate(value))
    }

    /// Accept several payload parts of one signal, summed
    pub fn check_parts<'a>(
        &self,
        parts: impl IntoIterator<Item = &'a Value>,
    ) -> Result<usize, SignalError> {
        self.check_estimate(parts.into_iter().map(Self::estimate).sum())
    }

    fn check_estimate(&self, size: usize) -> Result<usize, SignalError> {
        if size > self.limit {
            warn!(size, limit = self.limit, "rejecting oversized payload");
            return Err(SignalError::PayloadTooLarge {
                size,
                limit: self.limit,
            });
        }
        Ok(size)
    }

    /// Size check plus key validation over the whole tree
    pub fn check(&self, value: &Value) -> Result<usize, SignalError> {
        validate_keys(value)?;
        self.check_size(value)
    }
}

fn string_size(s: &str) -> usize {
    2 + s
        .chars()
        .map(|c| match c {
            '"' | '\\' | '\n' | '\r' | '\t' | '\u{08}' | '\u{0c}' => 2,
            c if (c as u32) < 0x20 => 6,
            c => c.len_utf8(),
        })
        .sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_estimate_matches_compact_rendering() {
        let samples = [
            json!(null),
            json!(false),
            json!(-12.5),
            json!("quote \" and \\ and\nnewline \u{1} ünï"),
            json!([1, "two", [true], {}]),
            json!({"attributes": {"color": "red", "size": [1, 2, 3]}, "empty": {}}),
        ];
        for sample in samples {
            let rendered = serde_json::to_string(&sample).unwrap();
            assert_eq!(SizeGuard::estimate(&sample), rendered.len(), "{rendered}");
        }
    }

    #[test]
    fn test_boundary() {
        let payload = json!({"color": "red"});
        let size = SizeGuard::estimate(&payload);

        assert_eq!(SizeGuard::new(size).check_size(&payload), Ok(size));
        assert_eq!(
            SizeGuard::new(size - 1).check_size(&payload),
            Err(SignalError::PayloadTooLarge {
                size,
                limit: size - 1
            })
        );
    }

    #[test]
    fn test_parts_are_summed() {
        let a = json!("abc");
        let b = json!(12);
        let guard = SizeGuard::new(6);
        assert_eq!(guard.check_parts([&a, &b]), Err(SignalError::PayloadTooLarge { size: 7, limit: 6 }));
        assert_eq!(SizeGuard::new(7).check_parts([&a, &b]), Ok(7));
    }

    #[test]
    fn test_check_validates_keys() {
        let guard = SizeGuard::new(1024);
        let err = guard.check(&json!({"bad/key": 1})).unwrap_err();
        assert!(err.is_invalid_key());
        assert!(guard.check(&json!({"good": {"nested": 1}})).is_ok());
    }
}
