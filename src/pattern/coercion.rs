//! Type coercion between literal text, JSON values and event values
//!
//! Condition literals are plain text. They are parsed once at compile time
//! into every domain they could be compared in; event values coming from
//! JSON are converted into the engine's `Value` type here as well.

use crate::event::Value;
use ipnetwork::IpNetwork;
use std::net::IpAddr;

/// Parse an integer literal: decimal with optional sign, or `0x` hex
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    text.parse::<i64>().ok()
}

/// Parse an IPv4 or IPv6 address
pub fn parse_ip(text: &str) -> Option<IpAddr> {
    text.trim().parse::<IpAddr>().ok()
}

/// Parse a network in CIDR form; a bare address becomes a host network
pub fn parse_net(text: &str) -> Option<IpNetwork> {
    let text = text.trim();
    if text.contains('/') {
        // shorthand addresses such as `10/8` are not accepted
        let (addr, _) = text.split_once('/')?;
        parse_ip(addr)?;
        return text.parse::<IpNetwork>().ok();
    }
    parse_ip(text).map(IpNetwork::from)
}

/// Parse a boolean literal, case-insensitively
pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Decode a hex byte literal. Whitespace between bytes is ignored.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err("empty byte string".to_string());
    }
    hex::decode(&compact).map_err(|e| e.to_string())
}

/// Convert a JSON number to an integer, truncating finite floats that fit
fn json_number_to_int(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.as_u64().is_some() {
        // larger than i64::MAX
        return None;
    }
    let f = n.as_f64()?;
    if !f.is_finite() {
        return None;
    }
    const I64_MAX_PLUS_ONE: f64 = 9223372036854775808.0;
    const I64_MIN_F64: f64 = -9223372036854775808.0;
    let truncated = f.trunc();
    if truncated >= I64_MAX_PLUS_ONE || truncated < I64_MIN_F64 {
        None
    } else {
        Some(truncated as i64)
    }
}

/// Render a JSON scalar as text for string matching
fn json_scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match json_number_to_int(n) {
            Some(i) => i.to_string(),
            None => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Convert a JSON value into an event value.
///
/// `null` is not applicable. Arrays become sets of their stringified
/// elements; objects are rendered as JSON text.
pub fn json_to_value(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => match json_number_to_int(n) {
            Some(i) => Some(Value::Int(i)),
            None => Some(Value::from(n.to_string())),
        },
        serde_json::Value::String(s) => Some(Value::from(s.as_str())),
        serde_json::Value::Array(items) => Some(Value::Set(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(json_scalar_text)
                .collect(),
        )),
        serde_json::Value::Object(_) => Some(Value::from(value.to_string())),
    }
}
