//! Persisted document storage
//!
//! Every Focuspath store (profile, knowledge memory, feedback, stats, web
//! usage log) is one JSON document loaded whole and rewritten whole after
//! each mutation. Loading overlays what is on disk over the current defaults
//! so documents written by older versions pick up newly added fields.

pub mod json;

pub use json::JsonDocument;

use serde_json::Value;

/// Overlay `loaded` onto `defaults`.
///
/// Objects are merged key by key, recursively; any other value present in
/// `loaded` replaces the default outright (arrays are not concatenated).
/// A `null` in `loaded` still overrides, so explicit "absent" survives.
pub fn merge_over_defaults(defaults: Value, loaded: Value) -> Value {
    match (defaults, loaded) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_over_defaults(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, loaded) => loaded,
    }
}
