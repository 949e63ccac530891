//! JSON bodies.

use flongo_core::Payload;
use serde_json::Value;

pub(crate) fn parse_json(body: &[u8]) -> Payload {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut payload = Payload::new();
            payload.insert("data".to_string(), other);
            payload
        }
        Err(error) => {
            tracing::warn!(%error, "ignoring malformed JSON body");
            Payload::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_body() {
        let payload = parse_json(br#"{"_id": 5, "nested": {"a": [1, 2]}}"#);
        assert_eq!(payload["_id"], json!(5));
        assert_eq!(payload["nested"], json!({"a": [1, 2]}));
    }

    #[test]
    fn test_non_object_body_is_wrapped() {
        assert_eq!(parse_json(b"[1, 2]")["data"], json!([1, 2]));
        assert_eq!(parse_json(b"\"hi\"")["data"], json!("hi"));
    }

    #[test]
    fn test_malformed_body_is_empty() {
        assert!(parse_json(b"{not json").is_empty());
        assert!(parse_json(b"").is_empty());
    }
}
