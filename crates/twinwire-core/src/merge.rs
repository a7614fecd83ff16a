//! JSON Merge Patch (RFC 7396)
//!
//! A [`MergePatch`] is a `(path, value)` pair scoped to a sub-tree of the
//! entity. Applying it is equivalent to nesting the value along the path and
//! merging that document into the target at the root.

use crate::config::ProtocolConfig;
use crate::error::{SignalError, ValidationError};
use crate::guard::SizeGuard;
use crate::status::HttpStatus;
use crate::value::{JsonObject, JsonPointer, Value};
use crate::version::SchemaVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Condition expressions keyed by the sub-resource they guard. Evaluated by
/// downstream collaborators; carried here losslessly.
pub type PatchConditions = BTreeMap<JsonPointer, String>;

/// Merge `patch` into `target`: objects merge key by key, `null` deletes the
/// key, anything else replaces
pub fn merge_patch(target: &Value, patch: &Value) -> Value {
    let Value::Object(patch_map) = patch else {
        return patch.clone();
    };
    let mut result = match target {
        Value::Object(map) => map.clone(),
        _ => JsonObject::new(),
    };
    for (key, patch_value) in patch_map {
        if patch_value.is_null() {
            result.remove(key);
        } else {
            let merged = merge_patch(result.get(key).unwrap_or(&Value::Null), patch_value);
            result.insert(key.clone(), merged);
        }
    }
    Value::Object(result)
}

/// A patch addressed at the document root must be an object
pub fn ensure_root_object(path: &JsonPointer, value: &Value) -> Result<(), ValidationError> {
    if path.is_root() && !value.is_object() {
        return Err(ValidationError::NotAnObject {
            context: "a merge patch at the document root",
        });
    }
    Ok(())
}

/// Validated partial update of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct MergePatch {
    path: JsonPointer,
    value: Value,
    version: SchemaVersion,
    conditions: PatchConditions,
}

impl MergePatch {
    /// Validate against the process-wide configuration
    pub fn new(path: JsonPointer, value: Value, version: SchemaVersion) -> Result<Self, SignalError> {
        let config = ProtocolConfig::current();
        Self::validated(
            path,
            value,
            version,
            &SizeGuard::from_config(config),
            config.strict_no_op_merge,
        )
    }

    /// Validate with an explicit guard and no-op policy
    pub fn validated(
        path: JsonPointer,
        value: Value,
        version: SchemaVersion,
        guard: &SizeGuard,
        strict_no_op: bool,
    ) -> Result<Self, SignalError> {
        ensure_root_object(&path, &value)?;
        let no_op = path.is_root() && value.as_object().is_some_and(JsonObject::is_empty);
        if no_op && strict_no_op && version.is_strict() {
            return Err(SignalError::MergePatchNoOp {
                path: path.to_string(),
            });
        }
        guard.check(&value)?;
        Ok(Self {
            path,
            value,
            version,
            conditions: PatchConditions::new(),
        })
    }

    #[must_use]
    pub fn with_conditions(self, conditions: PatchConditions) -> Self {
        Self { conditions, ..self }
    }

    pub fn path(&self) -> &JsonPointer {
        &self.path
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Schema version the patch was validated at
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn conditions(&self) -> &PatchConditions {
        &self.conditions
    }

    /// The patch expressed against the document root
    pub fn to_root_patch(&self) -> Value {
        self.path.wrap(self.value.clone())
    }

    /// New document with this patch applied
    pub fn apply_to(&self, document: &Value) -> Value {
        merge_patch(document, &self.to_root_patch())
    }
}

/// Outcome reported by a merge response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeStatus {
    Applied,
    DryRun,
}

impl MergeStatus {
    /// The only status each outcome may carry
    pub fn http_status(self) -> HttpStatus {
        match self {
            Self::Applied => HttpStatus::OK,
            Self::DryRun => HttpStatus::ACCEPTED,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "Applied",
            Self::DryRun => "DryRun",
        }
    }
}

impl fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ptr(s: &str) -> JsonPointer {
        JsonPointer::parse(s).unwrap()
    }

    fn patch(path: &str, value: Value) -> Result<MergePatch, SignalError> {
        MergePatch::validated(ptr(path), value, SchemaVersion::V2, &SizeGuard::new(1024), true)
    }

    #[test]
    fn test_rfc7396_examples() {
        let cases = [
            (json!({"a": "b"}), json!({"a": "c"}), json!({"a": "c"})),
            (json!({"a": "b"}), json!({"b": "c"}), json!({"a": "b", "b": "c"})),
            (json!({"a": "b"}), json!({"a": null}), json!({})),
            (json!({"a": "b", "b": "c"}), json!({"a": null}), json!({"b": "c"})),
            (json!({"a": ["b"]}), json!({"a": "c"}), json!({"a": "c"})),
            (json!({"a": "c"}), json!({"a": ["b"]}), json!({"a": ["b"]})),
            (
                json!({"a": {"b": "c"}}),
                json!({"a": {"b": "d", "c": null}}),
                json!({"a": {"b": "d"}}),
            ),
            (json!({"a": [{"b": "c"}]}), json!({"a": [1]}), json!({"a": [1]})),
            (json!(["a", "b"]), json!(["c", "d"]), json!(["c", "d"])),
            (json!({"a": "b"}), json!(["c"]), json!(["c"])),
            (json!({"a": "foo"}), json!(null), json!(null)),
            (json!({"a": "foo"}), json!("bar"), json!("bar")),
            (json!({"e": null}), json!({"a": 1}), json!({"e": null, "a": 1})),
            (json!([1, 2]), json!({"a": "b", "c": null}), json!({"a": "b"})),
            (json!({}), json!({"a": {"bb": {"ccc": null}}}), json!({"a": {"bb": {}}})),
        ];
        for (target, patch, expected) in cases {
            assert_eq!(merge_patch(&target, &patch), expected, "{target} + {patch}");
        }
    }

    #[test]
    fn test_scoped_patch() {
        let doc = json!({"attributes": {"color": "blue", "size": 3}, "features": {}});
        let p = patch("/attributes", json!({"color": "red", "size": null})).unwrap();
        assert_eq!(
            p.apply_to(&doc),
            json!({"attributes": {"color": "red"}, "features": {}})
        );

        let delete = patch("/attributes/color", Value::Null).unwrap();
        assert_eq!(
            delete.apply_to(&doc),
            json!({"attributes": {"size": 3}, "features": {}})
        );

        let create = patch("/features/lamp/properties/on", json!(true)).unwrap();
        assert_eq!(
            ptr("/features/lamp/properties/on").get(&create.apply_to(&doc)),
            Some(&json!(true))
        );
    }

    #[test]
    fn test_root_patch_rules() {
        assert!(matches!(
            patch("/", json!({})),
            Err(SignalError::MergePatchNoOp { .. })
        ));
        // lenient version or policy accepts the empty patch
        let lenient = MergePatch::validated(
            JsonPointer::root(),
            json!({}),
            SchemaVersion::V1,
            &SizeGuard::new(1024),
            true,
        )
        .unwrap();
        assert_eq!(lenient.version(), SchemaVersion::V1);
        assert!(MergePatch::validated(
            JsonPointer::root(),
            json!({}),
            SchemaVersion::V2,
            &SizeGuard::new(1024),
            false
        )
        .is_ok());
        assert!(matches!(
            patch("/", json!(5)),
            Err(SignalError::Validation(ValidationError::NotAnObject { .. }))
        ));
        assert_eq!(
            ensure_root_object(&JsonPointer::root(), &json!([1])),
            Err(ValidationError::NotAnObject {
                context: "a merge patch at the document root"
            })
        );
        assert!(ensure_root_object(&ptr("/attributes"), &json!(5)).is_ok());
        // an empty object below the root is meaningful
        assert!(patch("/attributes", json!({})).is_ok());
    }

    #[test]
    fn test_patch_guards() {
        assert!(patch("/attributes", json!({"bad\u{1}key": 1}))
            .unwrap_err()
            .is_invalid_key());
        let big = json!({"blob": "x".repeat(2000)});
        assert!(matches!(
            patch("/attributes", big),
            Err(SignalError::PayloadTooLarge { limit: 1024, .. })
        ));
    }

    #[test]
    fn test_conditions_preserved() {
        let mut conditions = PatchConditions::new();
        conditions.insert(ptr("/attributes/color"), "eq(attributes/color,\"blue\")".to_string());
        let p = patch("/", json!({"attributes": {"color": "red"}}))
            .unwrap()
            .with_conditions(conditions.clone());
        assert_eq!(p.conditions(), &conditions);
    }

    #[test]
    fn test_merge_status() {
        assert_eq!(MergeStatus::Applied.http_status(), HttpStatus::OK);
        assert_eq!(MergeStatus::DryRun.http_status(), HttpStatus::ACCEPTED);
        assert_eq!(serde_json::to_value(MergeStatus::DryRun).unwrap(), json!("DryRun"));
    }
}
