//! Lenient scalar coercion for loosely typed API values
//!
//! The remote API returns numbers both as JSON numbers and as strings
//! (`"12"`, `"19.6"`). These helpers read either form the way a lenient
//! numeric cast does: the longest numeric prefix wins and anything
//! unparseable becomes zero.

use serde_json::Value;

/// Coerce a JSON value to an integer.
///
/// - integers are returned as-is (`u64` above `i64::MAX` saturates)
/// - floats are truncated toward zero (saturating, NaN is 0)
/// - strings use their leading integer (`" 12abc"` is 12, `"12.7"` is 12)
/// - booleans are 1/0, null is 0
/// - arrays and objects are 0 when empty, 1 otherwise
///
/// # Examples
///
/// ```
/// use ofleet_domain::utils::coerce::coerce_i64;
/// use serde_json::json;
///
/// assert_eq!(coerce_i64(&json!("15")), 15);
/// assert_eq!(coerce_i64(&json!(9.99)), 9);
/// assert_eq!(coerce_i64(&json!(null)), 0);
/// ```
#[must_use]
pub fn coerce_i64(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else if n.as_u64().is_some() {
                i64::MAX
            } else {
                // `as` saturates on overflow and maps NaN to 0
                n.as_f64().map_or(0, |f| f.trunc() as i64)
            }
        }
        Value::String(s) => parse_leading_i64(s),
        Value::Array(items) => i64::from(!items.is_empty()),
        Value::Object(map) => i64::from(!map.is_empty()),
    }
}

/// Coerce a JSON value to a float, with the same leniency as [`coerce_i64`].
#[must_use]
pub fn coerce_f64(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_leading_f64(s).unwrap_or(0.0),
        Value::Array(items) => f64::from(u8::from(!items.is_empty())),
        Value::Object(map) => f64::from(u8::from(!map.is_empty())),
    }
}

/// Strict numeric read: JSON numbers and numeric strings only.
///
/// Returns `None` for anything that does not carry a number.
#[must_use]
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn parse_leading_i64(input: &str) -> i64 {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut total: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(byte - b'0');
        total = total.saturating_mul(10).saturating_add(digit);
    }

    if negative {
        total.saturating_neg()
    } else {
        total
    }
}

fn parse_leading_f64(input: &str) -> Option<f64> {
    let trimmed = input.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    trimmed[..end].parse::<f64>().ok()
}
