//! Attribute resolution over raw API payloads.
//!
//! Backend versions disagree on field names (`title` vs `name`,
//! `duration_minutes` vs `duration`, collections nested under `modules`,
//! `results` or `data`). Instead of scattering fallback chains through the
//! normalizer, every logical attribute is resolved here once, against a
//! prioritized candidate list.

use std::str::FromStr;

use serde_json::Value;

/// Read a single attribute, coercing JSON scalars through `FromStr`.
pub fn get_attribute<T>(value: &Value, attribute: &str) -> Option<T>
where
    T: FromStr,
{
    value.get(attribute).and_then(|v| match v {
        Value::String(s) => T::from_str(s).ok(),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                T::from_str(&f.to_string()).ok()
            } else {
                None
            }
        }
        Value::Bool(b) => T::from_str(&b.to_string()).ok(),
        _ => None,
    })
}

/// Resolve the first candidate attribute carrying a usable (non-falsy)
/// value. Empty strings, zero and `false` fall through to the next
/// candidate, matching how the upstream frontends chained their fallbacks.
pub fn resolve<T>(value: &Value, candidates: &[&str]) -> Option<T>
where
    T: FromStr,
{
    candidates.iter().find_map(|key| {
        let v = value.get(key)?;
        if !is_usable(v) {
            return None;
        }
        get_attribute(value, key)
    })
}

/// Resolve a prioritized string attribute, skipping empty strings.
pub fn resolve_str(value: &Value, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    })
}

/// Resolve an identifier that may arrive as a string or a number.
pub fn resolve_id(value: &Value, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|key| match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Numeric attribute parsed leniently: accepts numbers and numeric strings,
/// truncating fractions. `"12.5"` and `12.5` both resolve to `12`.
pub fn resolve_u64(value: &Value, candidates: &[&str]) -> Option<u64> {
    resolve::<f64>(value, candidates).map(|f| f.max(0.0) as u64)
}

/// Truthiness in the upstream sense: `true`, any non-zero number and any
/// non-empty string count as set.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}

/// Unwrap a collection response that is either a bare array or an object
/// nesting the array under `modules`, `results` or `data`.
pub fn as_collection(value: &Value) -> Vec<&Value> {
    let array = if let Some(items) = value.as_array() {
        Some(items)
    } else {
        ["modules", "results", "data"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_array))
    };

    array.map(|items| items.iter().collect()).unwrap_or_default()
}

fn is_usable(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
