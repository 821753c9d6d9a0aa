//! Typed token classification.
//!
//! A token starting with `:` is a JSON literal. Anything else loses one pair of
//! surrounding double quotes and becomes a number when it reads as one, or a
//! string otherwise, so `foo` and `"foo"` classify the same way.

use crate::JboxError;
use jbox_api::Value;

/// Classify one raw positional token (or parameter value) into a `Value`.
pub fn classify(token: &str) -> Result<Value, JboxError> {
    if let Some(literal) = token.strip_prefix(':') {
        return Value::from_json_str(literal).map_err(|e| JboxError::MalformedLiteral {
            token: token.to_string(),
            reason: e.to_string(),
        });
    }

    let text = token.strip_prefix('"').unwrap_or(token);
    let text = text.strip_suffix('"').unwrap_or(text);

    if text.chars().any(char::is_control) {
        return Err(JboxError::UnprintableToken(token.to_string()));
    }

    if is_json_number(text) {
        if let Ok(number) = Value::from_json_str(text) {
            return Ok(number);
        }
    }

    Ok(Value::String(text.to_string()))
}

/// True if `text` matches the JSON number grammar exactly.
///
/// Leading zeros (`007`) and bare signs are rejected, so they stay strings.
pub fn is_json_number(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;

    if bytes.first() == Some(&b'-') {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_len = i - int_start;
    if int_len == 0 || (int_len > 1 && bytes[int_start] == b'0') {
        return false;
    }

    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return false;
        }
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}
