//! JWT validation against the issuer's JWKS.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (`DoS` prevention)
//! - Exactly one algorithm is accepted, pinned by configuration
//! - The JWK must match the pinned algorithm's key type
//! - Claims are checked in a fixed order: `exp`, `aud`, `iss`, `iat`
//! - Error values are coarse so clients learn which check failed, not why

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::auth::AuthError;
use common::jwt::{decode_jwk_component, inspect_header, validate_iat_at};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// The signing algorithm tokens must use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256; what hosted identity providers issue.
    #[default]
    Rs256,
    /// Ed25519.
    EdDsa,
}

impl TokenAlgorithm {
    /// Header `alg` value for this algorithm.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenAlgorithm::Rs256 => "RS256",
            TokenAlgorithm::EdDsa => "EdDSA",
        }
    }

    /// JWK `kty` the verification key must have.
    pub fn key_type(self) -> &'static str {
        match self {
            TokenAlgorithm::Rs256 => "RSA",
            TokenAlgorithm::EdDsa => "OKP",
        }
    }

    fn jsonwebtoken_algorithm(self) -> Algorithm {
        match self {
            TokenAlgorithm::Rs256 => Algorithm::RS256,
            TokenAlgorithm::EdDsa => Algorithm::EdDSA,
        }
    }
}

impl fmt::Display for TokenAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(TokenAlgorithm::Rs256),
            "EdDSA" => Ok(TokenAlgorithm::EdDsa),
            other => Err(format!("unsupported algorithm '{other}', expected RS256 or EdDSA")),
        }
    }
}

/// Expected token properties.
#[derive(Debug, Clone)]
pub struct ValidationSettings {
    pub issuer: String,
    pub audience: String,
    pub algorithm: TokenAlgorithm,
    pub clock_skew: Duration,
}

/// JWT validator using keys from the issuer's JWKS.
pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    settings: ValidationSettings,
}

impl JwtValidator {
    pub fn new(jwks_client: Arc<JwksClient>, settings: ValidationSettings) -> Self {
        Self {
            jwks_client,
            settings,
        }
    }

    /// The key set this validator resolves keys from.
    pub fn jwks_client(&self) -> &Arc<JwksClient> {
        &self.jwks_client
    }

    /// Validate a JWT and return the claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size check and header inspection (`alg`, `kid`) without trusting it
    /// 2. `alg` must equal the pinned algorithm
    /// 3. Resolve the key by `kid` from the JWKS
    /// 4. Verify the signature
    /// 5. `exp`, `aud`, `iss`, then `iat` against the clock skew
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` of the first check that fails.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let header = inspect_header(token).map_err(|e| {
            tracing::debug!(target: "catalog.auth.jwt", error = ?e, "Token header inspection failed");
            AuthError::InvalidHeader
        })?;

        if header.alg != self.settings.algorithm.as_str() {
            tracing::debug!(
                target: "catalog.auth.jwt",
                alg = %header.alg,
                expected = %self.settings.algorithm,
                "Token algorithm not allowed"
            );
            return Err(AuthError::InvalidHeader);
        }

        let jwk = self.jwks_client.get_key(&header.kid).await?;

        let claims = verify_token(token, &jwk, self.settings.algorithm)?;

        self.check_claims(&claims, chrono::Utc::now().timestamp())?;

        tracing::debug!(target: "catalog.auth.jwt", "Token validated successfully");
        Ok(claims)
    }

    /// Claim checks that follow signature verification, against `now`.
    fn check_claims(&self, claims: &Claims, now: i64) -> Result<(), AuthError> {
        if claims.exp <= now {
            tracing::debug!(target: "catalog.auth.jwt", exp = claims.exp, now = now, "Token expired");
            return Err(AuthError::TokenExpired);
        }

        let audience_ok = claims
            .aud
            .as_ref()
            .is_some_and(|aud| aud.contains(&self.settings.audience));
        if !audience_ok {
            tracing::debug!(target: "catalog.auth.jwt", aud = ?claims.aud, "Token audience mismatch");
            return Err(AuthError::InvalidAudience);
        }

        if claims.iss.as_deref() != Some(self.settings.issuer.as_str()) {
            tracing::debug!(target: "catalog.auth.jwt", iss = ?claims.iss, "Token issuer mismatch");
            return Err(AuthError::InvalidIssuer);
        }

        if let Some(iat) = claims.iat {
            validate_iat_at(iat, self.settings.clock_skew, now).map_err(|e| {
                tracing::debug!(target: "catalog.auth.jwt", error = ?e, "Token iat validation failed");
                AuthError::IssuedInFuture
            })?;
        }

        Ok(())
    }
}

/// Build the decoding key for `algorithm` from a JWK.
fn decoding_key(jwk: &Jwk, algorithm: TokenAlgorithm) -> Result<DecodingKey, AuthError> {
    if jwk.kty != algorithm.key_type() {
        tracing::warn!(target: "catalog.auth.jwt", kty = %jwk.kty, "Unexpected JWK key type");
        return Err(AuthError::BadSignature);
    }
    if let Some(alg) = &jwk.alg {
        if alg != algorithm.as_str() {
            tracing::warn!(target: "catalog.auth.jwt", alg = %alg, "Unexpected JWK algorithm");
            return Err(AuthError::BadSignature);
        }
    }

    match algorithm {
        TokenAlgorithm::Rs256 => {
            let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                tracing::error!(target: "catalog.auth.jwt", kid = %jwk.kid, "RSA JWK missing n or e");
                return Err(AuthError::BadSignature);
            };
            DecodingKey::from_rsa_components(n, e).map_err(|e| {
                tracing::error!(target: "catalog.auth.jwt", error = %e, "Invalid RSA key components");
                AuthError::BadSignature
            })
        }
        TokenAlgorithm::EdDsa => {
            if jwk.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                tracing::warn!(target: "catalog.auth.jwt", crv = ?jwk.crv, "Unexpected JWK curve");
                return Err(AuthError::BadSignature);
            }
            let x = jwk.x.as_deref().ok_or_else(|| {
                tracing::error!(target: "catalog.auth.jwt", kid = %jwk.kid, "JWK missing x field");
                AuthError::BadSignature
            })?;
            let public_key_bytes = decode_jwk_component(x).map_err(|e| {
                tracing::error!(target: "catalog.auth.jwt", error = %e, "Invalid public key encoding");
                AuthError::BadSignature
            })?;
            Ok(DecodingKey::from_ed_der(&public_key_bytes))
        }
    }
}

/// Verify the signature and decode the claims.
///
/// Temporal and audience checks are disabled here; `check_claims` runs them
/// in a fixed order once the signature holds.
fn verify_token(token: &str, jwk: &Jwk, algorithm: TokenAlgorithm) -> Result<Claims, AuthError> {
    let key = decoding_key(jwk, algorithm)?;

    let mut validation = Validation::new(algorithm.jsonwebtoken_algorithm());
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(target: "catalog.auth.jwt", error = %e, "Token verification failed");
        match e.kind() {
            ErrorKind::Json(_) | ErrorKind::Utf8(_) => AuthError::MalformedClaims,
            _ => AuthError::BadSignature,
        }
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    const NOW: i64 = 1_700_000_000;

    fn validator(algorithm: TokenAlgorithm) -> JwtValidator {
        let jwks_client = Arc::new(JwksClient::new(
            "http://localhost:8082/.well-known/jwks.json".to_string(),
        ));
        JwtValidator::new(
            jwks_client,
            ValidationSettings {
                issuer: "https://issuer.example.com/".to_string(),
                audience: "catalog".to_string(),
                algorithm,
                clock_skew: Duration::from_secs(300),
            },
        )
    }

    fn claims(value: serde_json::Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    fn good_claims() -> serde_json::Value {
        serde_json::json!({
            "sub": "user",
            "iss": "https://issuer.example.com/",
            "aud": "catalog",
            "exp": NOW + 3600,
            "iat": NOW,
            "permissions": []
        })
    }

    fn with(field: &str, value: serde_json::Value) -> Claims {
        let mut payload = good_claims();
        payload
            .as_object_mut()
            .unwrap()
            .insert(field.to_string(), value);
        claims(payload)
    }

    fn unsigned_token(header: &str, payload: &str) -> String {
        format!(
            "{}.{}.c2lnbmF0dXJl",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    fn okp_jwk() -> Jwk {
        Jwk {
            kty: "OKP".to_string(),
            kid: "test-key".to_string(),
            alg: Some("EdDSA".to_string()),
            key_use: Some("sig".to_string()),
            crv: Some("Ed25519".to_string()),
            x: Some(URL_SAFE_NO_PAD.encode([7u8; 32])),
            n: None,
            e: None,
        }
    }

    // =========================================================================
    // Claim checks
    // =========================================================================

    #[test]
    fn test_check_claims_accepts_valid_claims() {
        let v = validator(TokenAlgorithm::Rs256);
        assert!(v.check_claims(&claims(good_claims()), NOW).is_ok());
    }

    #[test]
    fn test_check_claims_expired() {
        let v = validator(TokenAlgorithm::Rs256);
        assert_eq!(
            v.check_claims(&with("exp", (NOW - 1).into()), NOW),
            Err(AuthError::TokenExpired)
        );
        // exp == now is already expired
        assert_eq!(
            v.check_claims(&with("exp", NOW.into()), NOW),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_check_claims_audience() {
        let v = validator(TokenAlgorithm::Rs256);

        let array = with("aud", serde_json::json!(["other", "catalog"]));
        assert!(v.check_claims(&array, NOW).is_ok());

        let wrong = with("aud", serde_json::json!("other"));
        assert_eq!(v.check_claims(&wrong, NOW), Err(AuthError::InvalidAudience));

        let mut payload = good_claims();
        payload.as_object_mut().unwrap().remove("aud");
        assert_eq!(
            v.check_claims(&claims(payload), NOW),
            Err(AuthError::InvalidAudience)
        );
    }

    #[test]
    fn test_check_claims_issuer_is_exact() {
        let v = validator(TokenAlgorithm::Rs256);

        let no_slash = with("iss", serde_json::json!("https://issuer.example.com"));
        assert_eq!(
            v.check_claims(&no_slash, NOW),
            Err(AuthError::InvalidIssuer)
        );

        let mut payload = good_claims();
        payload.as_object_mut().unwrap().remove("iss");
        assert_eq!(
            v.check_claims(&claims(payload), NOW),
            Err(AuthError::InvalidIssuer)
        );
    }

    #[test]
    fn test_check_claims_iat_skew() {
        let v = validator(TokenAlgorithm::Rs256);

        assert!(v.check_claims(&with("iat", (NOW + 300).into()), NOW).is_ok());
        assert_eq!(
            v.check_claims(&with("iat", (NOW + 301).into()), NOW),
            Err(AuthError::IssuedInFuture)
        );

        let mut payload = good_claims();
        payload.as_object_mut().unwrap().remove("iat");
        assert!(v.check_claims(&claims(payload), NOW).is_ok());
    }

    #[test]
    fn test_check_claims_order_expiry_first() {
        let v = validator(TokenAlgorithm::Rs256);
        let everything_wrong = claims(serde_json::json!({
            "sub": "user",
            "iss": "https://evil.example.com/",
            "aud": "other",
            "exp": NOW - 10,
            "iat": NOW + 10_000
        }));
        assert_eq!(
            v.check_claims(&everything_wrong, NOW),
            Err(AuthError::TokenExpired)
        );

        let wrong_aud_and_iss = claims(serde_json::json!({
            "sub": "user",
            "iss": "https://evil.example.com/",
            "aud": "other",
            "exp": NOW + 10
        }));
        assert_eq!(
            v.check_claims(&wrong_aud_and_iss, NOW),
            Err(AuthError::InvalidAudience)
        );
    }

    // =========================================================================
    // Header and key checks (no network reached)
    // =========================================================================

    #[tokio::test]
    async fn test_validate_rejects_other_algorithm_before_key_lookup() {
        let v = validator(TokenAlgorithm::Rs256);
        for alg in ["HS256", "none", "EdDSA", "rs256"] {
            let token = unsigned_token(
                &format!(r#"{{"alg":"{alg}","typ":"JWT","kid":"k"}}"#),
                r#"{"sub":"x","exp":9999999999}"#,
            );
            assert_eq!(
                v.validate(&token).await.unwrap_err(),
                AuthError::InvalidHeader,
                "alg {alg} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_header() {
        let v = validator(TokenAlgorithm::Rs256);

        let no_kid = unsigned_token(r#"{"alg":"RS256"}"#, "{}");
        assert_eq!(v.validate(&no_kid).await.unwrap_err(), AuthError::InvalidHeader);

        assert_eq!(v.validate("garbage").await.unwrap_err(), AuthError::InvalidHeader);

        let oversized = "a".repeat(common::jwt::MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(v.validate(&oversized).await.unwrap_err(), AuthError::InvalidHeader);
    }

    #[test]
    fn test_decoding_key_rejects_wrong_key_type() {
        let jwk = okp_jwk();
        assert_eq!(
            decoding_key(&jwk, TokenAlgorithm::Rs256).err(),
            Some(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_decoding_key_rejects_mismatched_jwk_alg() {
        let mut jwk = okp_jwk();
        jwk.alg = Some("RS256".to_string());
        assert_eq!(
            decoding_key(&jwk, TokenAlgorithm::EdDsa).err(),
            Some(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_decoding_key_rejects_missing_components() {
        let mut okp = okp_jwk();
        okp.x = None;
        assert_eq!(
            decoding_key(&okp, TokenAlgorithm::EdDsa).err(),
            Some(AuthError::BadSignature)
        );

        let mut bad_b64 = okp_jwk();
        bad_b64.x = Some("!!!invalid-base64!!!".to_string());
        assert_eq!(
            decoding_key(&bad_b64, TokenAlgorithm::EdDsa).err(),
            Some(AuthError::BadSignature)
        );

        let rsa = Jwk {
            kty: "RSA".to_string(),
            kid: "rsa".to_string(),
            alg: None,
            key_use: None,
            crv: None,
            x: None,
            n: Some("xmvS".to_string()),
            e: None,
        };
        assert_eq!(
            decoding_key(&rsa, TokenAlgorithm::Rs256).err(),
            Some(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_decoding_key_rejects_other_curve() {
        let mut jwk = okp_jwk();
        jwk.crv = Some("X25519".to_string());
        assert_eq!(
            decoding_key(&jwk, TokenAlgorithm::EdDsa).err(),
            Some(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_verify_token_with_forged_signature() {
        let token = unsigned_token(
            r#"{"alg":"EdDSA","typ":"JWT","kid":"test-key"}"#,
            r#"{"sub":"test","exp":9999999999}"#,
        );
        assert_eq!(
            verify_token(&token, &okp_jwk(), TokenAlgorithm::EdDsa).unwrap_err(),
            AuthError::BadSignature
        );
    }

    #[test]
    fn test_token_algorithm_parsing() {
        assert_eq!("RS256".parse(), Ok(TokenAlgorithm::Rs256));
        assert_eq!("EdDSA".parse(), Ok(TokenAlgorithm::EdDsa));
        assert!("HS256".parse::<TokenAlgorithm>().is_err());
        assert_eq!(TokenAlgorithm::default(), TokenAlgorithm::Rs256);
        assert_eq!(TokenAlgorithm::EdDsa.to_string(), "EdDSA");
    }
}
