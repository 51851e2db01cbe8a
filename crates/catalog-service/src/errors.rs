//! Catalog service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl and render
//! as `{"success": false, "error": <status>, "message": <text>}`. Database
//! and internal messages returned to clients are generic; the actual errors
//! are logged server-side.

use crate::auth::AuthorizationError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Catalog service error type.
///
/// Maps to HTTP status codes:
/// - Auth: 401 or 403 as decided by the gateway
/// - BadRequest: 400 Bad Request
/// - NotFound: 404 Not Found
/// - MethodNotAllowed: 405 Method Not Allowed
/// - RequestTimeout: 408 Request Timeout
/// - PayloadTooLarge: 413 Payload Too Large
/// - Unprocessable: 422 Unprocessable Entity
/// - Database, Internal: 500 Internal Server Error
/// - Status: any other status produced below the handlers
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Authorization failed: {0}")]
    Auth(AuthorizationError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal,

    #[error("HTTP {0}")]
    Status(StatusCode),
}

impl CatalogError {
    /// Error for a bare status returned by the router or a tower layer.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => CatalogError::BadRequest("bad request".to_string()),
            StatusCode::NOT_FOUND => CatalogError::NotFound("resource not found".to_string()),
            StatusCode::METHOD_NOT_ALLOWED => CatalogError::MethodNotAllowed,
            StatusCode::REQUEST_TIMEOUT => CatalogError::RequestTimeout,
            StatusCode::PAYLOAD_TOO_LARGE => CatalogError::PayloadTooLarge,
            StatusCode::INTERNAL_SERVER_ERROR => CatalogError::Internal,
            other => CatalogError::Status(other),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CatalogError::Auth(err) => err.status,
            CatalogError::BadRequest(_) => 400,
            CatalogError::NotFound(_) => 404,
            CatalogError::MethodNotAllowed => 405,
            CatalogError::RequestTimeout => 408,
            CatalogError::PayloadTooLarge => 413,
            CatalogError::Unprocessable(_) => 422,
            CatalogError::Database(_) | CatalogError::Internal => 500,
            CatalogError::Status(status) => status.as_u16(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let (message, code) = match self {
            CatalogError::Auth(err) => (err.description, Some(err.code)),
            CatalogError::BadRequest(reason) => (reason, None),
            CatalogError::NotFound(resource) => (resource, None),
            CatalogError::MethodNotAllowed => ("method not allowed".to_string(), None),
            CatalogError::RequestTimeout => ("request timed out".to_string(), None),
            CatalogError::PayloadTooLarge => ("request body too large".to_string(), None),
            CatalogError::Unprocessable(reason) => (reason, None),
            CatalogError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "catalog.database", error = %err, "Database operation failed");
                ("Internal server error".to_string(), None)
            }
            CatalogError::Internal => ("Internal server error".to_string(), None),
            CatalogError::Status(status) => (
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_lowercase(),
                None,
            ),
        };

        let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            message,
            code,
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            let challenge = match code {
                Some("authorization_header_missing") | None => {
                    "Bearer realm=\"catalog\"".to_string()
                }
                Some(code) => format!("Bearer realm=\"catalog\", error=\"invalid_token\", error_description=\"{code}\""),
            };
            if let Ok(header_value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, header_value);
            }
        }

        response
    }
}

impl From<AuthorizationError> for CatalogError {
    fn from(err: AuthorizationError) -> Self {
        CatalogError::Auth(err)
    }
}

/// Convert sqlx errors to CatalogError
impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::Database(err.to_string())
    }
}
