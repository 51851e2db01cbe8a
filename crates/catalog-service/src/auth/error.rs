//! Failure taxonomy for the authorization chain.
//!
//! Each component of the chain returns an `AuthError`. The gateway turns it
//! into an [`AuthorizationError`](crate::auth::gateway::AuthorizationError)
//! with a status code, so nothing below the gateway knows about HTTP.
//!
//! Display strings are the client-facing descriptions. They name the failed
//! check (so "expired" is distinguishable from "bad signature") without
//! echoing token contents, key material, or upstream error text.

use thiserror::Error;

/// Why a request was not authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header on the request.
    #[error("Authorization header is expected.")]
    MissingAuth,

    /// Header present but not `Bearer <token>`.
    #[error("Authorization header must be a bearer token.")]
    MalformedAuth,

    /// Token header unreadable, missing `kid`/`alg`, or `alg` not allowlisted.
    #[error("Token header is invalid.")]
    InvalidHeader,

    /// JWKS could not be fetched (network, timeout, status, payload).
    #[error("Unable to verify the token at this time.")]
    KeySetUnavailable,

    /// No key in the current key set matches the token's `kid`.
    #[error("Unable to find the appropriate key.")]
    KeyNotFound,

    /// Signature does not verify, or the JWK is unusable for the pinned algorithm.
    #[error("Token signature is invalid.")]
    BadSignature,

    /// Signature verified but the payload is not a usable claim set.
    #[error("Unable to parse authentication token.")]
    MalformedClaims,

    /// `exp` is not in the future.
    #[error("Token expired.")]
    TokenExpired,

    /// `aud` does not contain the expected audience.
    #[error("Incorrect claims. Please check the audience.")]
    InvalidAudience,

    /// `iss` does not equal the expected issuer.
    #[error("Incorrect claims. Please check the issuer.")]
    InvalidIssuer,

    /// `iat` is further in the future than the allowed clock skew.
    #[error("Token issued in the future.")]
    IssuedInFuture,

    /// Verified claims carry no `permissions` field.
    #[error("Permissions not included in token.")]
    PermissionsClaimMissing,

    /// `permissions` present but lacks the required permission.
    #[error("Permission not found.")]
    PermissionDenied,
}

impl AuthError {
    /// HTTP status for this failure: 403 for authorization, 401 otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::PermissionsClaimMissing | AuthError::PermissionDenied => 403,
            _ => 401,
        }
    }

    /// Stable machine-readable code, also used as the metrics `reason` label.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingAuth => "authorization_header_missing",
            AuthError::MalformedAuth | AuthError::InvalidHeader => "invalid_header",
            AuthError::KeySetUnavailable => "key_set_unavailable",
            AuthError::KeyNotFound => "key_not_found",
            AuthError::BadSignature => "invalid_signature",
            AuthError::MalformedClaims => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidAudience | AuthError::InvalidIssuer | AuthError::IssuedInFuture => {
                "invalid_claims"
            }
            AuthError::PermissionsClaimMissing => "permissions_missing",
            AuthError::PermissionDenied => "permission_denied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHENTICATION_FAILURES: &[AuthError] = &[
        AuthError::MissingAuth,
        AuthError::MalformedAuth,
        AuthError::InvalidHeader,
        AuthError::KeySetUnavailable,
        AuthError::KeyNotFound,
        AuthError::BadSignature,
        AuthError::MalformedClaims,
        AuthError::TokenExpired,
        AuthError::InvalidAudience,
        AuthError::InvalidIssuer,
        AuthError::IssuedInFuture,
    ];

    #[test]
    fn test_authentication_failures_are_401() {
        for err in AUTHENTICATION_FAILURES {
            assert_eq!(err.status_code(), 401, "{err:?} should be 401");
        }
    }

    #[test]
    fn test_authorization_failures_are_403() {
        assert_eq!(AuthError::PermissionsClaimMissing.status_code(), 403);
        assert_eq!(AuthError::PermissionDenied.status_code(), 403);
    }

    #[test]
    fn test_expired_message_mentions_expiry() {
        assert!(AuthError::TokenExpired.to_string().contains("expired"));
    }

    #[test]
    fn test_permission_failures_have_distinct_codes() {
        assert_ne!(
            AuthError::PermissionsClaimMissing.code(),
            AuthError::PermissionDenied.code()
        );
    }
}
