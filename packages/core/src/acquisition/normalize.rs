//! Lenient readers over upstream JSON.
//!
//! Provider bodies are loosely shaped. Structure is validated once (the body
//! must be an object and must not carry a provider error); below that,
//! absent or wrong-typed leaves map to `None` or an empty slice instead of
//! failing the whole response.

use serde_json::{Map, Value};

use super::error::ProviderError;

/// The body as an object, or a format error. A provider-reported `error`
/// string is surfaced as [`ProviderError::Upstream`].
pub fn expect_object(raw: &Value) -> Result<&Map<String, Value>, ProviderError> {
    let object = raw
        .as_object()
        .ok_or_else(|| ProviderError::format("response body is not a JSON object"))?;

    if let Some(message) = object.get("error").and_then(Value::as_str) {
        return Err(ProviderError::upstream(message));
    }

    Ok(object)
}

/// Follow `keys` through nested objects.
pub fn path<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(value, |current, key| current.get(*key))
}

/// Array under `key`, empty when absent or not an array.
pub fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Non-blank string under `key`.
pub fn string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(as_text)
}

pub fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Number under `key`. Accepts JSON numbers and numeric strings such as
/// `"$1,249"`.
pub fn number(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(as_number)
}

pub fn as_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Non-negative integer under `key`.
pub fn unsigned(value: &Value, key: &str) -> Option<u32> {
    number(value, key)
        .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n.round() as u32)
}
