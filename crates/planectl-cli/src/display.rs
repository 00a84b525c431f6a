//! One-shot output helpers
//!
//! Table rendering is shared with the lifecycle stream blocks and lives
//! in planectl-watch; this module adds the cell shaping the request/
//! response commands need.

use serde_json::Value;

pub use planectl_watch::render::render_table;

/// Stringify one JSON field for a table cell. Missing and null become
/// a dash, strings render unquoted.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Same as [`cell`] but with a caller-supplied fallback.
pub fn cell_or(value: Option<&Value>, fallback: &str) -> String {
    match value {
        None | Some(Value::Null) => fallback.to_string(),
        Some(Value::String(s)) if s.is_empty() => fallback.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Pretty-print a payload for `--json` one-shot output.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

/// Iterate the objects of an array payload; anything else yields nothing.
pub fn objects(value: &Value) -> impl Iterator<Item = &Value> {
    value
        .as_array()
        .map(|a| a.as_slice())
        .unwrap_or(&[])
        .iter()
        .filter(|entry| entry.is_object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_shapes_scalars() {
        assert_eq!(cell(None), "-");
        assert_eq!(cell(Some(&Value::Null)), "-");
        assert_eq!(cell(Some(&json!("ready"))), "ready");
        assert_eq!(cell(Some(&json!(42))), "42");
        assert_eq!(cell(Some(&json!(true))), "true");
    }

    #[test]
    fn cell_or_falls_back_on_empty_strings() {
        assert_eq!(cell_or(Some(&json!("")), "unknown"), "unknown");
        assert_eq!(cell_or(Some(&json!("named")), "unknown"), "named");
    }

    #[test]
    fn objects_skips_non_objects() {
        let value = json!([{"a": 1}, "noise", 3, {"b": 2}]);
        assert_eq!(objects(&value).count(), 2);
        assert_eq!(objects(&json!("x")).count(), 0);
    }
}
