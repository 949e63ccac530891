//! Query string parsing.

use flongo_core::Payload;
use serde_json::{Number, Value};

/// Parses a query string into a flat payload.
///
/// Values that look like integers, floats, booleans or `null` are converted
/// to the matching JSON type; everything else stays a string. A key that
/// appears more than once collects its values into an array.
///
/// ```rust
/// use flongo_extract::parse_query;
///
/// let payload = parse_query("_id=5&name=ada&tag=a&tag=b&ok=true");
/// assert_eq!(payload["_id"], 5);
/// assert_eq!(payload["name"], "ada");
/// assert_eq!(payload["tag"], serde_json::json!(["a", "b"]));
/// assert_eq!(payload["ok"], true);
/// ```
#[must_use]
pub fn parse_query(query: &str) -> Payload {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => collect_pairs(pairs, coerce_scalar),
        Err(error) => {
            tracing::warn!(%error, "ignoring malformed query string");
            Payload::new()
        }
    }
}

/// Folds `(key, value)` pairs into a payload, turning repeated keys into arrays.
pub(crate) fn collect_pairs<F>(pairs: Vec<(String, String)>, convert: F) -> Payload
where
    F: Fn(String) -> Value,
{
    let mut payload = Payload::new();
    for (key, raw) in pairs {
        let value = convert(raw);
        match payload.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                payload.insert(key, value);
            }
        }
    }
    payload
}

fn coerce_scalar(raw: String) -> Value {
    match raw.as_str() {
        "true" | "True" => return Value::Bool(true),
        "false" | "False" => return Value::Bool(false),
        "null" | "None" => return Value::Null,
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(int) = raw.parse::<u64>() {
        return Value::Number(int.into());
    }
    if is_integer_literal(&raw) || significant_digits(&raw) > EXACT_F64_DIGITS {
        return Value::String(raw);
    }
    if looks_numeric(&raw) {
        if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    Value::String(raw)
}

/// Decimal digits any `f64` reproduces exactly.
const EXACT_F64_DIGITS: usize = 15;

fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Counts mantissa digits, ignoring leading zeros and the exponent.
fn significant_digits(raw: &str) -> usize {
    let mantissa = raw.split(['e', 'E']).next().unwrap_or(raw);
    mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .skip_while(|b| *b == b'0')
        .count()
}

/// Rejects words such as `inf` or `NaN` that `f64` would otherwise accept.
fn looks_numeric(raw: &str) -> bool {
    raw.bytes().any(|b| b.is_ascii_digit())
        && raw
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_query() {
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn test_scalar_coercion() {
        let payload = parse_query("a=1&b=-2.5&c=false&d=null&e=1e3&f=inf&g=007x");
        assert_eq!(payload["a"], json!(1));
        assert_eq!(payload["b"], json!(-2.5));
        assert_eq!(payload["c"], json!(false));
        assert_eq!(payload["d"], Value::Null);
        assert_eq!(payload["e"], json!(1000.0));
        assert_eq!(payload["f"], json!("inf"));
        assert_eq!(payload["g"], json!("007x"));
    }

    #[test]
    fn test_large_integers_keep_their_digits() {
        let payload = parse_query(
            "order=12345678901234567891&big=123456789012345678901234&neg=-99999999999999999999",
        );
        assert_eq!(payload["order"], json!(12_345_678_901_234_567_891_u64));
        assert_eq!(payload["big"], json!("123456789012345678901234"));
        assert_eq!(payload["neg"], json!("-99999999999999999999"));
    }

    #[test]
    fn test_long_decimals_stay_strings() {
        let payload = parse_query("pi=3.14159265358979323846&short=0.000125");
        assert_eq!(payload["pi"], json!("3.14159265358979323846"));
        assert_eq!(payload["short"], json!(0.000_125));
    }

    #[test]
    fn test_percent_decoding() {
        let payload = parse_query("q=hello%20world&name=J%C3%BCrgen");
        assert_eq!(payload["q"], json!("hello world"));
        assert_eq!(payload["name"], json!("Jürgen"));
    }

    #[test]
    fn test_repeated_keys_become_arrays() {
        let payload = parse_query("id=1&id=2&id=3");
        assert_eq!(payload["id"], json!([1, 2, 3]));
    }

    #[test]
    fn test_order_is_preserved() {
        let payload = parse_query("z=1&a=2&m=3");
        let keys: Vec<_> = payload.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
