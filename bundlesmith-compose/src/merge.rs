//! Recursive merge over configuration trees.
//!
//! The tree is the tagged union `serde_json::Value` gives us: objects are
//! maps, arrays are lists, everything else is a scalar. Maps merge key-wise
//! recursively, lists append base-then-overlay without dedup, and a later
//! scalar always wins. Mismatched node kinds behave like scalars: the
//! overlay replaces the base wholesale.

use serde_json::Value;

pub fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.remove(&key) {
                    Some(existing) => {
                        base.insert(key, merge(existing, value));
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Object(base)
        }
        (Value::Array(mut base), Value::Array(overlay)) => {
            base.extend(overlay);
            Value::Array(base)
        }
        (_, overlay) => overlay,
    }
}

/// Fold a stack of layers, earliest first.
pub fn merge_layers(layers: impl IntoIterator<Item = Value>) -> Value {
    layers
        .into_iter()
        .fold(Value::Object(Default::default()), merge)
}
