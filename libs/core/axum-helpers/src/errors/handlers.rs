use axum::{http::StatusCode, response::Response};

use super::ErrorResponse;

/// Handler for 404 Not Found errors.
///
/// This can be used as a fallback handler in your router.
pub async fn not_found() -> Response {
    ErrorResponse::new("The requested resource was not found").with_status(StatusCode::NOT_FOUND)
}
