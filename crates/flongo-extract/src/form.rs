//! URL-encoded form bodies.

use crate::query::collect_pairs;
use flongo_core::Payload;
use serde_json::Value;

/// Parses an `application/x-www-form-urlencoded` body.
///
/// Field values stay strings; repeated fields become arrays.
pub(crate) fn parse_form(body: &[u8]) -> Payload {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
        Ok(pairs) => collect_pairs(pairs, Value::String),
        Err(error) => {
            tracing::warn!(%error, "ignoring malformed form body");
            Payload::new()
        }
    }
}
