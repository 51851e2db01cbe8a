//! Builder for test token claims
//!
//! Defaults match `server_harness`: issuer `TEST_ISSUER`, audience
//! `TEST_AUDIENCE`, valid for an hour, no permissions.

use crate::crypto_fixtures::TestKey;
use crate::server_harness::{TEST_AUDIENCE, TEST_ISSUER};
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Builder for test JWT claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject("auth0|alice")
///     .with_permissions(&["get:movies", "post:movies"])
///     .expires_in(600)
///     .sign(&key);
/// ```
pub struct TestTokenBuilder {
    sub: String,
    iss: Option<String>,
    aud: Option<Value>,
    exp: i64,
    iat: Option<i64>,
    permissions: Option<Vec<String>>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            iss: Some(TEST_ISSUER.to_string()),
            aud: Some(Value::String(TEST_AUDIENCE.to_string())),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: Some(now.timestamp()),
            permissions: Some(Vec::new()),
        }
    }

    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(|p| p.to_string()).collect());
        self
    }

    /// Omit the `permissions` claim entirely.
    pub fn without_permissions(mut self) -> Self {
        self.permissions = None;
        self
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Set `aud` to any JSON value (string or array).
    pub fn with_audience(mut self, audience: Value) -> Self {
        self.aud = Some(audience);
        self
    }

    pub fn without_audience(mut self) -> Self {
        self.aud = None;
        self
    }

    /// Set expiration in seconds from now; negative values produce an expired token.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = Some(timestamp);
        self
    }

    pub fn without_issued_at(mut self) -> Self {
        self.iat = None;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!(self.sub));
        if let Some(iss) = self.iss {
            claims.insert("iss".to_string(), json!(iss));
        }
        if let Some(aud) = self.aud {
            claims.insert("aud".to_string(), aud);
        }
        claims.insert("exp".to_string(), json!(self.exp));
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), json!(iat));
        }
        if let Some(permissions) = self.permissions {
            claims.insert("permissions".to_string(), json!(permissions));
        }
        Value::Object(claims)
    }

    /// Build and sign with `key`.
    pub fn sign(self, key: &TestKey) -> String {
        key.sign(&self.build())
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
