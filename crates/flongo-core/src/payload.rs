//! Request payloads.

use crate::error::{ApiError, ApiResult};
use http::StatusCode;
use serde_json::{Map, Value};

/// Ordered string-keyed map merged from the query string and the request body.
///
/// Key order follows first appearance: query parameters first, then body
/// fields. A body field with the same name as a query parameter replaces its
/// value in place.
pub type Payload = Map<String, Value>;

/// Returns the value of `field`, or a 400 error naming it.
pub fn ensure_field<'a>(payload: &'a Payload, field: &str) -> ApiResult<&'a Value> {
    payload.get(field).ok_or_else(|| {
        ApiError::request_handling(
            format!("Missing required field [{field}]"),
            StatusCode::BAD_REQUEST,
        )
        .with_data("field", field)
    })
}
