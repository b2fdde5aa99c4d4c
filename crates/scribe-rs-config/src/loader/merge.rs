//! JSON merge helpers for layered configuration.

use serde_json::{Map, Value};

/// Deep-merge `overlay` into `base`.
///
/// Objects merge key by key; any other value replaces what was there. A leaf
/// that also appears in `locks` is left untouched so the requirements layer
/// keeps the final say.
pub(super) fn overlay(base: &mut Value, overlay: &Value, locks: Option<&Value>) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let lock = match locks {
                    Some(Value::Object(lock_map)) => lock_map.get(key),
                    _ => None,
                };
                if lock.is_some_and(|lock| !lock.is_object()) {
                    continue;
                }
                match base_map.get_mut(key) {
                    Some(existing) => self::overlay(existing, value, lock),
                    None => {
                        let mut slot = if value.is_object() {
                            Value::Object(Map::new())
                        } else {
                            Value::Null
                        };
                        self::overlay(&mut slot, value, lock);
                        if !slot.is_null() {
                            base_map.insert(key.clone(), slot);
                        }
                    }
                }
            }
        }
        (slot, value) => {
            if locks.is_none() {
                *slot = value.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::overlay;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_leaves_replace() {
        let mut base = json!({ "ledger": { "backend": "file", "path": "a" } });
        overlay(&mut base, &json!({ "ledger": { "path": "b" } }), None);
        assert_eq!(base, json!({ "ledger": { "backend": "file", "path": "b" } }));
    }

    #[test]
    fn locked_leaves_are_skipped() {
        let mut base = json!({});
        let locks = json!({ "ledger": { "index_key": "locked" } });
        overlay(
            &mut base,
            &json!({ "ledger": { "index_key": "mine", "path": "p" } }),
            Some(&locks),
        );
        assert_eq!(base, json!({ "ledger": { "path": "p" } }));
    }
}
