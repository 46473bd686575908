//! Structural change detection over canonical JSON.
//!
//! Two states are equal when their canonical serializations match: object
//! keys sorted at every depth, no insignificant whitespace. Identity and key
//! insertion order never matter.

use serde::Serialize;
use serde_json::{Map, Value};

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Stable-key-order JSON for `value`.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    Ok(sort_keys(serde_json::to_value(value)?).to_string())
}

/// `true` when `current` differs from the last successfully persisted form.
/// Nothing persisted yet counts as dirty.
pub fn is_dirty<T: Serialize + ?Sized>(
    current: &T,
    last_saved: Option<&str>,
) -> Result<bool, serde_json::Error> {
    let canonical = canonical_json(current)?;
    Ok(last_saved != Some(canonical.as_str()))
}

/// Remembers the canonical form of the last persisted state.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    last_saved: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a state already known to match the server, e.g. one just loaded.
    pub fn with_baseline<T: Serialize + ?Sized>(state: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            last_saved: Some(canonical_json(state)?),
        })
    }

    pub fn is_dirty<T: Serialize + ?Sized>(&self, state: &T) -> Result<bool, serde_json::Error> {
        is_dirty(state, self.last_saved.as_deref())
    }

    pub fn is_dirty_canonical(&self, canonical: &str) -> bool {
        self.last_saved.as_deref() != Some(canonical)
    }

    pub fn mark_saved(&mut self, canonical: String) {
        self.last_saved = Some(canonical);
    }

    pub fn baseline(&self) -> Option<&str> {
        self.last_saved.as_deref()
    }

    pub fn reset(&mut self) {
        self.last_saved = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_matter() {
        let a = json!({"name": "Ada", "dates": {"born": 1815, "died": 1852}});
        let b = json!({"dates": {"died": 1852, "born": 1815}, "name": "Ada"});
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    }

    #[test]
    fn array_order_does_matter() {
        let a = json!({"survivors": ["Ann", "Bob"]});
        let b = json!({"survivors": ["Bob", "Ann"]});
        assert_ne!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
    }

    #[test]
    fn nested_objects_inside_arrays_are_sorted() {
        let a = json!([{"b": 1, "a": 2}]);
        assert_eq!(canonical_json(&a).unwrap(), r#"[{"a":2,"b":1}]"#);
    }

    #[test]
    fn nothing_saved_is_dirty() {
        assert!(is_dirty(&json!({}), None).unwrap());
    }

    #[test]
    fn detector_tracks_last_saved_form() {
        let mut detector = ChangeDetector::with_baseline(&json!({"title": "In memory"})).unwrap();
        assert!(!detector.is_dirty(&json!({"title": "In memory"})).unwrap());

        let edited = json!({"title": "In loving memory"});
        assert!(detector.is_dirty(&edited).unwrap());

        detector.mark_saved(canonical_json(&edited).unwrap());
        assert!(!detector.is_dirty(&edited).unwrap());

        detector.reset();
        assert!(detector.baseline().is_none());
        assert!(detector.is_dirty(&edited).unwrap());
    }
}
