//! Bearer token extraction from the `Authorization` header.

use crate::auth::AuthError;
use axum::http::HeaderValue;

/// Extract the bare token from an `Authorization: Bearer <token>` header.
///
/// The header must split on a single space into exactly two parts, the first
/// being `bearer` in any case and the second non-empty. The token is not
/// inspected further here.
///
/// # Errors
///
/// - `AuthError::MissingAuth` - No header was supplied
/// - `AuthError::MalformedAuth` - Any other shape, including non-visible-ASCII bytes
pub fn extract_bearer_token(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let header = header.ok_or_else(|| {
        tracing::debug!(target: "catalog.auth.bearer", "Missing Authorization header");
        AuthError::MissingAuth
    })?;

    let value = header.to_str().map_err(|_| {
        tracing::debug!(target: "catalog.auth.bearer", "Authorization header is not visible ASCII");
        AuthError::MalformedAuth
    })?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => {
            tracing::debug!(target: "catalog.auth.bearer", "Authorization header is not a bearer token");
            Err(AuthError::MalformedAuth)
        }
    }
}
