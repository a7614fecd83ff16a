//! Field metadata and visibility predicates
//!
//! Every wire field is declared once with its name, the schema versions it
//! exists in and a visibility kind. Encoders consult the definition together
//! with a caller-supplied predicate to decide whether the field is emitted.

use crate::version::SchemaVersion;
use std::fmt;
use std::sync::Arc;

/// Visibility class of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Always shown
    Regular,
    /// Shown only when the caller asks for special fields
    Special,
    /// Internal; shown only to predicates that accept hidden fields
    Hidden,
}

/// Declared wire field: name, version range, kind, and whether decoding requires it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub kind: FieldKind,
    pub since: SchemaVersion,
    pub until: SchemaVersion,
    pub required: bool,
}

impl FieldDefinition {
    pub const fn regular(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Regular,
            since: SchemaVersion::V1,
            until: SchemaVersion::LATEST,
            required: true,
        }
    }

    pub const fn special(name: &'static str) -> Self {
        Self {
            kind: FieldKind::Special,
            ..Self::regular(name)
        }
    }

    pub const fn hidden(name: &'static str) -> Self {
        Self {
            kind: FieldKind::Hidden,
            ..Self::regular(name)
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }

    pub const fn since(self, version: SchemaVersion) -> Self {
        Self {
            since: version,
            ..self
        }
    }

    pub const fn until(self, version: SchemaVersion) -> Self {
        Self {
            until: version,
            ..self
        }
    }

    /// Version gate: `since <= version <= until`
    pub fn exists_in(&self, version: SchemaVersion) -> bool {
        self.since <= version && version <= self.until
    }
}

/// Composable boolean function over field metadata
#[derive(Clone)]
pub struct FieldPredicate(Arc<dyn Fn(&FieldDefinition) -> bool + Send + Sync>);

impl FieldPredicate {
    pub fn new(f: impl Fn(&FieldDefinition) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn always() -> Self {
        Self::new(|_| true)
    }

    pub fn kind(kind: FieldKind) -> Self {
        Self::new(move |field| field.kind == kind)
    }

    pub fn not_hidden() -> Self {
        Self::kind(FieldKind::Hidden).not()
    }

    pub fn regular_or_special() -> Self {
        Self::kind(FieldKind::Regular).or(Self::kind(FieldKind::Special))
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::new(move |field| self.test(field) && other.test(field))
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::new(move |field| self.test(field) || other.test(field))
    }

    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(self) -> Self {
        Self::new(move |field| !self.test(field))
    }

    pub fn test(&self, field: &FieldDefinition) -> bool {
        (self.0)(field)
    }
}

impl Default for FieldPredicate {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldPredicate(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGULAR: FieldDefinition = FieldDefinition::regular("thingId");
    const SPECIAL: FieldDefinition = FieldDefinition::special("_timestamp").optional();
    const HIDDEN: FieldDefinition = FieldDefinition::hidden("__lifecycle");
    const V2_ONLY: FieldDefinition = FieldDefinition::regular("path").since(SchemaVersion::V2);

    #[test]
    fn test_version_gate() {
        assert!(REGULAR.exists_in(SchemaVersion::V1));
        assert!(REGULAR.exists_in(SchemaVersion::V2));
        assert!(!V2_ONLY.exists_in(SchemaVersion::V1));
        assert!(V2_ONLY.exists_in(SchemaVersion::V2));
        let v1_only = REGULAR.until(SchemaVersion::V1);
        assert!(!v1_only.exists_in(SchemaVersion::V2));
    }

    #[test]
    fn test_builtin_predicates() {
        let not_hidden = FieldPredicate::not_hidden();
        assert!(not_hidden.test(&REGULAR));
        assert!(not_hidden.test(&SPECIAL));
        assert!(!not_hidden.test(&HIDDEN));

        let regular_or_special = FieldPredicate::regular_or_special();
        assert!(regular_or_special.test(&SPECIAL));
        assert!(!regular_or_special.test(&HIDDEN));

        assert!(FieldPredicate::always().test(&HIDDEN));
    }

    #[test]
    fn test_composition() {
        let regular_only = FieldPredicate::not_hidden().and(FieldPredicate::kind(FieldKind::Special).not());
        assert!(regular_only.test(&REGULAR));
        assert!(!regular_only.test(&SPECIAL));
        assert!(!regular_only.test(&HIDDEN));

        let by_name = FieldPredicate::new(|field| field.name.starts_with('_'));
        assert!(by_name.clone().or(FieldPredicate::kind(FieldKind::Hidden)).test(&HIDDEN));
        assert!(!by_name.test(&REGULAR));
        assert!(!SPECIAL.required);
    }
}
