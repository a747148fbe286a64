//! Loose equality between primary-key / foreign-key values.
//!
//! Path parameters and query filters arrive as strings; stored primary keys
//! are frequently numbers (auto-incremented). Comparing them requires
//! normalizing both sides rather than a strict `Value == Value`.

use serde_json::Value;

/// Compares two JSON scalar values for identity purposes: numbers compare
/// numerically, everything else compares as a trimmed string.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x == y;
    }
    scalar_string(a).trim() == scalar_string(b).trim()
}

/// A string-typed path parameter compared against a record's primary key.
pub fn matches_id(value: &Value, raw_id: &str) -> bool {
    if let Ok(n) = raw_id.trim().parse::<i64>() {
        if let Some(v) = value.as_i64() {
            return v == n;
        }
    }
    scalar_string(value).trim() == raw_id.trim()
}

fn scalar_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
