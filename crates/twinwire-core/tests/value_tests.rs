//! Tests for keys, pointers and entity ids

use proptest::prelude::*;
use serde_json::json;
use twinwire_core::value::validate_keys;
use twinwire_core::{EntityId, EntityType, JsonKey, JsonPointer, ValidationError};

#[test]
fn test_pointer_document_operations() {
    let doc = json!({
        "attributes": {"location": {"lat": 48.1, "lon": 11.5}},
        "features": {}
    });
    let lat = JsonPointer::parse("/attributes/location/lat").unwrap();

    assert_eq!(lat.get(&doc), Some(&json!(48.1)));
    assert_eq!(lat.parent().unwrap().to_string(), "/attributes/location");

    // set and remove leave the input alone
    let moved = lat.set(&doc, json!(52.5));
    assert_eq!(lat.get(&moved), Some(&json!(52.5)));
    assert_eq!(lat.get(&doc), Some(&json!(48.1)));

    let removed = lat.remove(&moved);
    assert_eq!(lat.get(&removed), None);
    assert_eq!(
        JsonPointer::parse("/attributes/location/lon").unwrap().get(&removed),
        Some(&json!(11.5))
    );
}

#[test]
fn test_entity_ids() {
    let id = EntityId::thing("org.eclipse_1.things:sensor-7").unwrap();
    assert_eq!(id.entity_type(), EntityType::Thing);
    assert_eq!(id.namespace(), "org.eclipse_1.things");
    assert_eq!(id.name(), "sensor-7");
    assert_eq!(id.to_string(), "org.eclipse_1.things:sensor-7");

    assert!(EntityId::thing(":no-namespace").is_ok());
    for bad in ["no-colon", "1org:name", "org..x:name", "org:", "org:a/b", "org:a\u{0}"] {
        assert!(
            matches!(
                EntityId::thing(bad),
                Err(ValidationError::InvalidEntityId { .. })
            ),
            "{bad:?} should be rejected"
        );
    }
    assert!(EntityId::thing(&format!("org:{}", "x".repeat(300))).is_err());

    assert!(EntityId::connection("amqp-1:primary").is_ok());
    assert!(EntityId::connection("").is_err());
    assert!(EntityId::connection("with space").is_err());
}

fn valid_key() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_.:-]{1,16}"
}

proptest! {
    #[test]
    fn prop_valid_keys_accepted(key in valid_key()) {
        prop_assert!(JsonKey::new(key.clone()).is_ok());
        let doc = json!({ key: 1 });
        prop_assert!(validate_keys(&doc).is_ok());
    }

    #[test]
    fn prop_keys_with_separator_rejected(prefix in valid_key(), suffix in valid_key()) {
        let key = format!("{prefix}/{suffix}");
        let is_invalid_key = matches!(
            JsonKey::new(key.clone()),
            Err(ValidationError::InvalidKey { .. })
        );
        prop_assert!(is_invalid_key);
        let doc = json!({"nested": { key: true }});
        prop_assert!(validate_keys(&doc).is_err());
    }

    #[test]
    fn prop_pointer_display_parses_back(keys in prop::collection::vec(valid_key(), 0..5)) {
        let pointer = keys
            .iter()
            .map(|k| JsonKey::new(k.clone()).unwrap())
            .fold(JsonPointer::root(), |p, k| p.append(k));
        prop_assert_eq!(JsonPointer::parse(&pointer.to_string()).unwrap(), pointer.clone());
        prop_assert_eq!(pointer.wrap(json!(1)), pointer.set(&json!({}), json!(1)));
    }
}
