use serde_json::{Map, Value};

use super::{CANONICAL_ORDER, Field};

/// Sets `field` in `obj`, keeping the canonical field order relative to existing keys.
///
/// An existing field is replaced where it stands. A new field goes right after the
/// closest field preceding it in [`CANONICAL_ORDER`] that `obj` already has, or at the
/// end when there is none. Keys already present never move.
pub fn set_in_order(obj: &mut Map<String, Value>, field: Field, value: Value) {
    let key = field.as_str();
    if let Some(slot) = obj.get_mut(key) {
        *slot = value;
        return;
    }

    let index = CANONICAL_ORDER
        .iter()
        .position(|k| *k == key)
        .unwrap_or(CANONICAL_ORDER.len());
    let Some(ideal) = CANONICAL_ORDER[..index]
        .iter()
        .rev()
        .find(|k| obj.contains_key(**k))
    else {
        obj.insert(key.to_owned(), value);
        return;
    };

    let mut value = Some(value);
    for (k, v) in std::mem::take(obj) {
        let insert_after = k == *ideal;
        obj.insert(k, v);
        if insert_after {
            if let Some(value) = value.take() {
                obj.insert(key.to_owned(), value);
            }
        }
    }
}
