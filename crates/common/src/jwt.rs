//! JWT utilities shared across the catalog crates.
//!
//! This module provides the parts of token validation that need no key
//! material:
//! - Size limits for `DoS` prevention
//! - Clock skew constants for `iat` validation
//! - Untrusted inspection of the JOSE header (`alg`, `kid`)
//! - `iat` validation logic
//! - base64url decoding of JWK components
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Header inspection never trusts the header for anything but key lookup
//!   and the algorithm allowlist check; the signature must still be verified
//! - Error messages are generic to prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{inspect_header, validate_iat_at, DEFAULT_CLOCK_SKEW};
//!
//! let header = inspect_header(token)?;
//! if header.alg != "RS256" {
//!     return Err("algorithm not allowed");
//! }
//! let key = key_set.get_key(&header.kid).await?;
//! // ... verify signature, then:
//! validate_iat_at(claims.iat, DEFAULT_CLOCK_SKEW, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected before any base64 decoding or
/// cryptographic work. Typical access tokens carrying a permissions list are
/// well under 2KB.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default JWT clock skew tolerance (5 minutes).
///
/// Tokens with an `iat` more than this far in the future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum configurable JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT without a key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("Token exceeds the maximum allowed size")]
    TokenTooLarge,

    /// Token format is invalid (not header.payload.signature, bad base64, bad JSON).
    #[error("Token is not a well-formed JWT")]
    MalformedToken,

    /// Header has no usable `alg` value.
    #[error("Token header is missing the algorithm")]
    MissingAlgorithm,

    /// Header has no usable `kid` value.
    #[error("Token header is missing the key identifier")]
    MissingKid,

    /// Token `iat` claim is too far in the future.
    #[error("Token was issued in the future")]
    IatTooFarInFuture,
}

// =============================================================================
// Header Inspection
// =============================================================================

/// The two header fields needed before a token can be verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared signing algorithm (e.g. `RS256`, `EdDSA`).
    pub alg: String,

    /// Key identifier used to select the verification key from the JWKS.
    pub kid: String,
}

/// Decode the JOSE header of a JWT without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - `kid` is only suitable for lookup in a trusted key set
/// - `alg` is only suitable for comparison against an allowlist
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong segment count, bad base64url, or non-JSON header
/// - `MissingAlgorithm` - `alg` absent, not a string, or empty
/// - `MissingKid` - `kid` absent, not a string, or empty
pub fn inspect_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let alg = non_empty_string(&header, "alg").ok_or(JwtValidationError::MissingAlgorithm)?;
    let kid = non_empty_string(&header, "kid").ok_or(JwtValidationError::MissingKid)?;

    Ok(TokenHeader { alg, kid })
}

fn non_empty_string(header: &serde_json::Value, field: &str) -> Option<String> {
    header
        .get(field)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

// =============================================================================
// Claim Helpers
// =============================================================================

/// Validate the `iat` (issued-at) claim against `now` with clock skew
/// tolerance. Callers pass the same `now` they checked `exp` against.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` past `now`.
pub fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Decode a base64url (unpadded) JWK component such as `x`, `n` or `e`.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the value is not valid base64url.
pub fn decode_jwk_component(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(value)
}

// =============================================================================
// Tests
// =============================================================================
