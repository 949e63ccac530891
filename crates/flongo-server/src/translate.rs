//! Converts pipeline errors into HTTP responses.

use flongo_core::{ApiError, ApiResponse};

/// Renders `error` in the uniform error shape:
/// `{"error": ..., "traceback": ..., "additional_data": {...}}`.
///
/// ```
/// use flongo_core::ApiError;
/// use flongo_server::error_response;
/// use http::StatusCode;
///
/// let response = error_response(&ApiError::new("Oh no! A value error!"));
/// assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
///
/// let body = response.json_object().unwrap();
/// assert_eq!(body["error"], "Oh no! A value error!");
/// assert!(body["traceback"].is_null());
/// ```
#[must_use]
pub fn error_response(error: &ApiError) -> ApiResponse {
    let status = error.status_code();
    match ApiResponse::try_json(&error.to_body()) {
        Ok(response) => response.with_status(status),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize error body");
            ApiResponse::text(error.message().to_string()).with_status(status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_data_and_trace_are_rendered() {
        let error = ApiError::forbidden("nope")
            .with_data("url", "/permissions")
            .with_stack_trace("trace");
        let response = error_response(&error);

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = response.json_object().unwrap();
        assert_eq!(body["additional_data"], json!({"url": "/permissions"}));
        assert_eq!(body["traceback"], json!("trace"));
    }
}
