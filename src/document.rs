//! Lenient JSON field access shared by the persisted-document code.
//!
//! Pre-0.4 configuration files were written by firmware that encoded unset
//! numeric fields as `0`, unset booleans as `0`/`1` integers, and simply
//! omitted unset strings. The helpers here resolve those conventions in one
//! place so the typed decode step stays declarative.

use serde_json::Value;

/// Parse a raw document into a JSON value
pub fn parse(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Render a JSON value as compact text, the format the firmware writes
pub fn to_text(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Borrow a named member of an optional JSON object
pub fn field<'a>(value: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    value.and_then(|v| v.get(key))
}

/// Borrow an array element of an optional JSON value
pub fn element(value: Option<&Value>, index: usize) -> Option<&Value> {
    value.and_then(|v| v.get(index))
}

/// True when the member is present on the object (whatever its value)
pub fn has(value: Option<&Value>, key: &str) -> bool {
    matches!(value, Some(v) if v.get(key).is_some())
}

/// String member, or the default when absent or not a string.
/// A present empty string is kept verbatim.
pub fn str_or(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

/// Boolean member; integer 0/1 encodings are accepted
pub fn bool_or(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(default),
        _ => default,
    }
}

/// Unsigned member kept verbatim, zero included; absent or out of range
/// falls back to the default
pub fn u8_or(value: Option<&Value>, default: u8) -> u8 {
    match value.and_then(Value::as_u64) {
        Some(n) if n <= u8::MAX as u64 => n as u8,
        _ => default,
    }
}

/// Unsigned member where zero means unset
pub fn nonzero_u8(value: Option<&Value>, default: u8) -> u8 {
    match value.and_then(Value::as_u64) {
        Some(n) if n != 0 && n <= u8::MAX as u64 => n as u8,
        _ => default,
    }
}

/// Unsigned member where zero means unset
pub fn nonzero_u16(value: Option<&Value>, default: u16) -> u16 {
    match value.and_then(Value::as_u64) {
        Some(n) if n != 0 && n <= u16::MAX as u64 => n as u16,
        _ => default,
    }
}

/// Signed member kept verbatim, zero included
pub fn i8_or(value: Option<&Value>, default: i8) -> i8 {
    match value.and_then(Value::as_i64) {
        Some(n) if n >= i8::MIN as i64 && n <= i8::MAX as i64 => n as i8,
        _ => default,
    }
}

/// Signed member where zero means unset
pub fn nonzero_i8(value: Option<&Value>, default: i8) -> i8 {
    match value.and_then(Value::as_i64) {
        Some(n) if n != 0 && n >= i8::MIN as i64 && n <= i8::MAX as i64 => n as i8,
        _ => default,
    }
}

/// Float member where zero means unset
pub fn nonzero_f64(value: Option<&Value>, default: f64) -> f64 {
    match value.and_then(Value::as_f64) {
        Some(n) if n != 0.0 => n,
        _ => default,
    }
}

/// Remove the transient `command` member carried by update payloads.
/// It routes the payload on the wire and must never reach the file.
pub fn strip_command(value: &mut Value) {
    if let Some(map) = value.as_object_mut() {
        map.remove("command");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(parse("{\"a\": 1}").is_ok());
        assert!(parse("{not json").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_field_and_element_navigation() {
        let doc = json!({"meter": [{"kwhimp": 400}]});
        let root = Some(&doc);

        let meter0 = element(field(root, "meter"), 0);
        assert!(meter0.is_some());
        assert_eq!(field(meter0, "kwhimp").and_then(Value::as_u64), Some(400));

        assert!(field(root, "missing").is_none());
        assert!(element(field(root, "meter"), 5).is_none());
        assert!(field(None, "anything").is_none());
    }

    #[test]
    fn test_has_reports_presence_not_truthiness() {
        let doc = json!({"logging": false, "dst": 0});
        let root = Some(&doc);

        assert!(has(root, "logging"));
        assert!(has(root, "dst"));
        assert!(!has(root, "api"));
        assert!(!has(None, "api"));
    }

    #[test]
    fn test_str_or_keeps_present_empty_string() {
        let doc = json!({"ssid": "", "pswd": "secret", "ip": 42});
        let root = Some(&doc);

        // Present empty string stays empty; only absence falls back
        assert_eq!(str_or(field(root, "ssid"), "EVSE-WiFi"), "");
        assert_eq!(str_or(field(root, "pswd"), ""), "secret");
        assert_eq!(str_or(field(root, "bssid"), "default"), "default");
        // Non-string values fall back too
        assert_eq!(str_or(field(root, "ip"), ""), "");
    }

    #[test]
    fn test_bool_or_accepts_integer_encoding() {
        let doc = json!({"a": true, "b": false, "c": 1, "d": 0, "e": "yes"});
        let root = Some(&doc);

        assert!(bool_or(field(root, "a"), false));
        assert!(!bool_or(field(root, "b"), true));
        assert!(bool_or(field(root, "c"), false));
        assert!(!bool_or(field(root, "d"), true));
        // Strings are not coerced
        assert!(!bool_or(field(root, "e"), false));
        assert!(bool_or(field(root, "missing"), true));
    }

    #[test]
    fn test_verbatim_numeric_helpers_keep_zero() {
        let doc = json!({"zero": 0, "big": 300, "neg": -5});
        let root = Some(&doc);

        assert_eq!(u8_or(field(root, "zero"), 7), 0);
        assert_eq!(u8_or(field(root, "big"), 7), 7); // out of range
        assert_eq!(u8_or(field(root, "missing"), 7), 7);

        assert_eq!(i8_or(field(root, "zero"), 1), 0);
        assert_eq!(i8_or(field(root, "neg"), 1), -5);
        assert_eq!(i8_or(field(root, "big"), 1), 1);
    }

    #[test]
    fn test_nonzero_helpers_treat_zero_as_unset() {
        let doc = json!({"zero": 0, "set": 400, "float_zero": 0.0, "price": 12.5});
        let root = Some(&doc);

        assert_eq!(nonzero_u8(field(root, "zero"), 17), 17);
        assert_eq!(nonzero_u16(field(root, "zero"), 1000), 1000);
        assert_eq!(nonzero_u16(field(root, "set"), 1000), 400);
        assert_eq!(nonzero_u16(field(root, "missing"), 30), 30);
        assert_eq!(nonzero_i8(field(root, "zero"), 112), 112);
        assert_eq!(nonzero_f64(field(root, "float_zero"), 25.0), 25.0);
        assert_eq!(nonzero_f64(field(root, "price"), 25.0), 12.5);
    }

    #[test]
    fn test_nonzero_u16_accepts_max() {
        let doc = json!({"v": 65535});
        assert_eq!(nonzero_u16(field(Some(&doc), "v"), 1), 65535);
    }

    #[test]
    fn test_strip_command_removes_only_top_level() {
        let mut doc = json!({
            "command": "updateconfig",
            "system": {"command": "nested"},
            "wifi": {"ssid": "x"}
        });
        strip_command(&mut doc);

        assert!(doc.get("command").is_none());
        // Nested members named "command" are real data and stay
        assert_eq!(doc["system"]["command"], "nested");
        assert_eq!(doc["wifi"]["ssid"], "x");
    }

    #[test]
    fn test_strip_command_tolerates_non_objects() {
        let mut doc = json!([1, 2, 3]);
        strip_command(&mut doc);
        assert_eq!(doc, json!([1, 2, 3]));
    }

    #[test]
    fn test_to_text_round_trips_through_parse() {
        let doc = json!({"configversion": 1, "wifi": {"ssid": "garage"}});
        let text = to_text(&doc);
        let reparsed = parse(&text).unwrap();
        assert_eq!(doc, reparsed);
    }
}
