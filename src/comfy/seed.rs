//! Seed coercion.
//!
//! Seeds show up as integers, decimal strings, hex strings and, on some custom
//! noise nodes, as a base seed plus an offset. Negative values mean "random"
//! to most UIs and are rejected.

use serde_json::Value;

const BASE_KEYS: &[&str] = &["seed", "base_seed"];
const OFFSET_KEYS: &[&str] = &["offset", "seed_offset"];

/// Coerce a JSON value into a seed.
///
/// Order: non-negative integer, decimal string, hex string, derived
/// `base + offset` object.
pub fn coerce(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Some(v)
            } else {
                n.as_f64().filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64).map(|f| f as u64)
            }
        }
        Value::String(s) => coerce_str(s),
        Value::Object(obj) => {
            let base = BASE_KEYS.iter().find_map(|k| obj.get(*k)).and_then(coerce)?;
            let offset = OFFSET_KEYS.iter().find_map(|k| obj.get(*k)).and_then(coerce).unwrap_or(0);
            Some(derive(base, offset))
        }
        _ => None,
    }
}

/// Coerce seed text: decimal first, then hex (`0x` prefix or any hex letter).
pub fn coerce_str(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('-') {
        return None;
    }
    if let Ok(v) = text.trim_start_matches('+').parse::<u64>() {
        return Some(v);
    }

    let (digits, prefixed) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    if !prefixed && !digits.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Derived seed, wrapping on overflow.
pub fn derive(
    base: u64,
    offset: u64,
) -> u64 {
    base.wrapping_add(offset)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(coerce(&json!(42)), Some(42));
        assert_eq!(coerce(&json!(12.0)), Some(12));
        assert_eq!(coerce(&json!(-1)), None);
        assert_eq!(coerce(&json!(1.5)), None);
        assert_eq!(coerce(&json!(u64::MAX)), Some(u64::MAX));
    }

    #[test]
    fn test_strings() {
        assert_eq!(coerce_str("123"), Some(123));
        assert_eq!(coerce_str(" 7 "), Some(7));
        assert_eq!(coerce_str("0x1F"), Some(31));
        assert_eq!(coerce_str("ff"), Some(255));
        assert_eq!(coerce_str("-5"), None);
        assert_eq!(coerce_str("seed"), None);
        assert_eq!(coerce_str(""), None);
        assert_eq!(coerce(&json!("0xff")), Some(255));
    }

    #[test]
    fn test_derived() {
        assert_eq!(coerce(&json!({"base_seed": 100, "seed_offset": 5})), Some(105));
        assert_eq!(coerce(&json!({"seed": "10", "offset": 1})), Some(11));
        assert_eq!(coerce(&json!({"seed": u64::MAX, "offset": 2})), Some(1));
        assert_eq!(coerce(&json!({"offset": 2})), None);
        assert_eq!(derive(u64::MAX, 1), 0);
    }

    #[test]
    fn test_other_values() {
        assert_eq!(coerce(&json!(null)), None);
        assert_eq!(coerce(&json!([1])), None);
        assert_eq!(coerce(&json!(true)), None);
    }
}
