//! JWKS client for fetching and caching the issuer's public keys.
//!
//! The JWKS (JSON Web Key Set) client fetches public keys from the issuer's
//! `/.well-known/jwks.json` endpoint and caches them, keyed by `kid`, with a
//! configurable TTL.
//!
//! # Refresh
//!
//! A cache miss (empty, expired, or unknown `kid`) triggers exactly one
//! re-fetch before failing. Concurrent misses coalesce: refreshes run under a
//! single lock and bump a generation counter, and a waiter that finds the
//! generation moved on while it queued reuses that outcome instead of
//! fetching again.
//!
//! # Security
//!
//! - Keys are replaced wholesale on refresh, never mutated in place
//! - Fetches are bounded by a timeout and fail closed
//! - HTTPS should be used in production (enforced by deployment config)

use crate::auth::AuthError;
use crate::observability::metrics::record_jwks_fetch;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Longest a fetched key set may be reused (one day).
pub const MAX_CACHE_TTL_SECONDS: u64 = 86_400;

/// Default upper bound for a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type: "RSA" or "OKP".
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: String,

    /// Algorithm advertised for this key, if any.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" for signing keys).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// Curve name for OKP keys ("Ed25519").
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// A fetched key set with its expiry.
struct CachedJwks {
    keys: HashMap<String, Jwk>,
    expires_at: Instant,
}

struct CacheState {
    cached: Option<CachedJwks>,

    /// Incremented after every completed fetch attempt.
    generation: u64,

    /// Outcome of the most recent fetch attempt.
    last_refresh: Result<(), AuthError>,
}

/// Expiry for a key set fetched now. TTLs past the cap are clamped.
fn expiry_after(ttl: Duration) -> Instant {
    let now = Instant::now();
    let ttl = ttl.min(Duration::from_secs(MAX_CACHE_TTL_SECONDS));
    now.checked_add(ttl).unwrap_or(now)
}

impl CacheState {
    fn fresh_key(&self, kid: &str) -> Option<Jwk> {
        self.cached
            .as_ref()
            .filter(|cached| cached.expires_at > Instant::now())
            .and_then(|cached| cached.keys.get(kid))
            .cloned()
    }
}

/// JWKS client for fetching and caching public keys.
///
/// Shared across requests behind an `Arc`; all interior state is guarded.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    state: RwLock<CacheState>,

    /// Serializes fetches so concurrent misses result in one request.
    refresh_lock: Mutex<()>,

    cache_ttl: Duration,
    fetch_timeout: Duration,
}

impl JwksClient {
    /// Create a client with the default TTL and fetch timeout.
    pub fn new(jwks_url: String) -> Self {
        Self::with_settings(
            jwks_url,
            Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
        )
    }

    /// Create a client with an explicit cache TTL and fetch timeout.
    pub fn with_settings(jwks_url: String, cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "catalog.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            state: RwLock::new(CacheState {
                cached: None,
                generation: 0,
                last_refresh: Ok(()),
            }),
            refresh_lock: Mutex::new(()),
            cache_ttl,
            fetch_timeout,
        }
    }

    /// URL this client fetches from.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Get a JWK by key ID.
    ///
    /// Serves from cache while fresh; otherwise refreshes once (coalesced with
    /// any concurrent refresh) and looks again.
    ///
    /// # Errors
    ///
    /// - `AuthError::KeySetUnavailable` - The key set could not be fetched
    /// - `AuthError::KeyNotFound` - The fetched key set has no such `kid`
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        let observed_generation = {
            let state = self.state.read().await;
            if let Some(key) = state.fresh_key(kid) {
                tracing::debug!(target: "catalog.auth.jwks", kid = %kid, "JWKS cache hit");
                return Ok(key);
            }
            state.generation
        };

        tracing::debug!(target: "catalog.auth.jwks", kid = %kid, "JWKS cache miss");
        self.refresh_if_unchanged(observed_generation).await?;

        let state = self.state.read().await;
        state.fresh_key(kid).ok_or_else(|| {
            tracing::warn!(target: "catalog.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
            AuthError::KeyNotFound
        })
    }

    /// Drop the cached key set so the next lookup fetches.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.cached = None;
        tracing::debug!(target: "catalog.auth.jwks", "JWKS cache invalidated");
    }

    /// Fetch unless another task completed a fetch since `observed_generation`.
    async fn refresh_if_unchanged(&self, observed_generation: u64) -> Result<(), AuthError> {
        let _refresh_guard = self.refresh_lock.lock().await;

        {
            let state = self.state.read().await;
            if state.generation != observed_generation {
                tracing::debug!(target: "catalog.auth.jwks", "Reusing concurrent JWKS refresh");
                return state.last_refresh;
            }
        }

        let outcome = self.fetch().await;

        let mut state = self.state.write().await;
        state.generation = state.generation.wrapping_add(1);
        state.last_refresh = match outcome {
            Ok(keys) => {
                state.cached = Some(CachedJwks {
                    keys,
                    expires_at: expiry_after(self.cache_ttl),
                });
                Ok(())
            }
            Err(e) => Err(e),
        };
        state.last_refresh
    }

    /// Fetch the key set, bounded by the fetch timeout.
    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<HashMap<String, Jwk>, AuthError> {
        tracing::debug!(target: "catalog.auth.jwks", url = %self.jwks_url, "Fetching JWKS");
        let start = Instant::now();

        let result = tokio::time::timeout(self.fetch_timeout, self.fetch_document()).await;

        let jwks = match result {
            Ok(Ok(jwks)) => {
                record_jwks_fetch("success", start.elapsed());
                jwks
            }
            Ok(Err(e)) => {
                record_jwks_fetch("error", start.elapsed());
                return Err(e);
            }
            Err(_) => {
                tracing::error!(
                    target: "catalog.auth.jwks",
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "JWKS fetch timed out"
                );
                record_jwks_fetch("timeout", start.elapsed());
                return Err(AuthError::KeySetUnavailable);
            }
        };

        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .filter(|key| !key.kid.is_empty())
            .filter(|key| key.key_use.as_deref().map_or(true, |u| u == "sig"))
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(
            target: "catalog.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        Ok(keys)
    }

    async fn fetch_document(&self) -> Result<JwksResponse, AuthError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "catalog.auth.jwks", error = %e, "Failed to fetch JWKS");
                AuthError::KeySetUnavailable
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "catalog.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeySetUnavailable);
        }

        response.json::<JwksResponse>().await.map_err(|e| {
            tracing::error!(target: "catalog.auth.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::KeySetUnavailable
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_jwk_deserialization_okp() {
        let json = r#"{
            "kty": "OKP",
            "kid": "test-key-01",
            "crv": "Ed25519",
            "x": "dGVzdC1wdWJsaWMta2V5LWRhdGE",
            "alg": "EdDSA",
            "use": "sig"
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "OKP");
        assert_eq!(jwk.kid, "test-key-01");
        assert_eq!(jwk.crv.as_deref(), Some("Ed25519"));
        assert_eq!(jwk.x.as_deref(), Some("dGVzdC1wdWJsaWMta2V5LWRhdGE"));
        assert_eq!(jwk.alg.as_deref(), Some("EdDSA"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert!(jwk.n.is_none());
    }

    #[test]
    fn test_jwk_deserialization_rsa_with_extra_fields() {
        // Auth0 publishes x5c/x5t alongside n/e
        let json = r#"{
            "kty": "RSA",
            "kid": "rsa-key",
            "use": "sig",
            "n": "xmvS",
            "e": "AQAB",
            "x5t": "abc",
            "x5c": ["MIIC"]
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.n.as_deref(), Some("xmvS"));
        assert_eq!(jwk.e.as_deref(), Some("AQAB"));
        assert!(jwk.alg.is_none());
    }

    #[test]
    fn test_jwks_response_deserialization() {
        let json = r#"{
            "keys": [
                {"kty": "OKP", "kid": "key-1"},
                {"kty": "RSA", "kid": "key-2"}
            ]
        }"#;

        let jwks: JwksResponse = serde_json::from_str(json).unwrap();

        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys.first().unwrap().kid, "key-1");
        assert_eq!(jwks.keys.get(1).unwrap().kid, "key-2");
    }

    #[test]
    fn test_jwks_client_defaults() {
        let client = JwksClient::new("http://localhost:8082/.well-known/jwks.json".to_string());
        assert_eq!(
            client.jwks_url(),
            "http://localhost:8082/.well-known/jwks.json"
        );
        assert_eq!(
            client.cache_ttl,
            Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS)
        );
        assert_eq!(
            client.fetch_timeout,
            Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS)
        );
    }

    #[test]
    fn test_expiry_clamps_oversized_ttl() {
        let before = Instant::now();
        let expires_at = expiry_after(Duration::MAX);

        assert!(expires_at >= before);
        assert!(expires_at <= Instant::now() + Duration::from_secs(MAX_CACHE_TTL_SECONDS));

        let short = expiry_after(Duration::from_secs(30));
        assert!(short <= Instant::now() + Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let client = JwksClient::with_settings(
            "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );

        let result = client.get_key("any").await;
        assert_eq!(result.unwrap_err(), AuthError::KeySetUnavailable);
    }

    #[tokio::test]
    async fn test_failed_refresh_advances_generation() {
        let client = JwksClient::with_settings(
            "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );

        let _ = client.get_key("any").await;

        let state = client.state.read().await;
        assert_eq!(state.generation, 1);
        assert_eq!(state.last_refresh, Err(AuthError::KeySetUnavailable));
        assert!(state.cached.is_none());
    }
}
