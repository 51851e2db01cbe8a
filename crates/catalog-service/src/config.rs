//! Catalog service configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! held as a `SecretString` and redacted in Debug output.

use crate::auth::jwks::{
    DEFAULT_CACHE_TTL_SECONDS, DEFAULT_FETCH_TIMEOUT_SECONDS, MAX_CACHE_TTL_SECONDS,
};
use crate::auth::{TokenAlgorithm, ValidationSettings};
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default per-request deadline in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Upper bound for `REQUEST_TIMEOUT_SECONDS`.
pub const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 300;

/// Upper bound for `JWKS_FETCH_TIMEOUT_SECONDS`.
pub const MAX_FETCH_TIMEOUT_SECONDS: u64 = 30;

/// Catalog service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub database_url: Option<SecretString>,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Expected `iss` claim.
    pub auth_issuer: String,

    /// Expected member of the `aud` claim.
    pub auth_audience: String,

    /// JWKS endpoint (default: `<issuer>/.well-known/jwks.json`).
    pub jwks_url: String,

    /// The single accepted token signing algorithm.
    pub jwt_algorithm: TokenAlgorithm,

    /// Clock skew tolerance in seconds for `iat` validation.
    pub jwt_clock_skew_seconds: u64,

    /// How long a fetched key set is reused.
    pub jwks_cache_ttl_seconds: u64,

    /// Upper bound for a single JWKS fetch.
    pub jwks_fetch_timeout_seconds: u64,

    /// Deadline for a whole request; late requests get a JSON 408.
    pub request_timeout_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("bind_address", &self.bind_address)
            .field("auth_issuer", &self.auth_issuer)
            .field("auth_audience", &self.auth_audience)
            .field("jwks_url", &self.jwks_url)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field("jwks_fetch_timeout_seconds", &self.jwks_fetch_timeout_seconds)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidJwtAlgorithm(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidJwksFetchTimeout(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .map(|url| SecretString::from(url.clone()));

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let auth_issuer = required(vars, "AUTH_ISSUER")?;
        let auth_audience = required(vars, "AUTH_AUDIENCE")?;

        let jwks_url = vars.get("AUTH_JWKS_URL").cloned().unwrap_or_else(|| {
            format!(
                "{}/.well-known/jwks.json",
                auth_issuer.trim_end_matches('/')
            )
        });

        let jwt_algorithm = match vars.get("JWT_ALGORITHM") {
            Some(value) => value
                .parse::<TokenAlgorithm>()
                .map_err(ConfigError::InvalidJwtAlgorithm)?,
            None => TokenAlgorithm::default(),
        };

        let jwt_clock_skew_seconds = parse_bounded(
            vars,
            "JWT_CLOCK_SKEW_SECONDS",
            DEFAULT_CLOCK_SKEW.as_secs(),
            MAX_CLOCK_SKEW.as_secs(),
        )
        .map_err(ConfigError::InvalidJwtClockSkew)?;

        let jwks_cache_ttl_seconds = parse_bounded(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_CACHE_TTL_SECONDS,
            MAX_CACHE_TTL_SECONDS,
        )
        .map_err(ConfigError::InvalidJwksCacheTtl)?;

        let jwks_fetch_timeout_seconds = parse_bounded(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_FETCH_TIMEOUT_SECONDS,
            MAX_FETCH_TIMEOUT_SECONDS,
        )
        .map_err(ConfigError::InvalidJwksFetchTimeout)?;

        let request_timeout_seconds = parse_bounded(
            vars,
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
            MAX_REQUEST_TIMEOUT_SECONDS,
        )
        .map_err(ConfigError::InvalidRequestTimeout)?;

        Ok(Config {
            database_url,
            bind_address,
            auth_issuer,
            auth_audience,
            jwks_url,
            jwt_algorithm,
            jwt_clock_skew_seconds,
            jwks_cache_ttl_seconds,
            jwks_fetch_timeout_seconds,
            request_timeout_seconds,
        })
    }

    /// Expected token properties for the validator.
    pub fn validation_settings(&self) -> ValidationSettings {
        ValidationSettings {
            issuer: self.auth_issuer.clone(),
            audience: self.auth_audience.clone(),
            algorithm: self.jwt_algorithm,
            clock_skew: Duration::from_secs(self.jwt_clock_skew_seconds),
        }
    }

    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_seconds)
    }

    pub fn jwks_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.jwks_fetch_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Parse an optional integer variable that must fall within `1..=max`.
fn parse_bounded(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    max: u64,
) -> Result<u64, String> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str
        .parse()
        .map_err(|e| format!("{name} must be a valid positive integer, got '{value_str}': {e}"))?;

    if value == 0 {
        return Err(format!("{name} must be greater than 0"));
    }

    if value > max {
        return Err(format!("{name} must not exceed {max} seconds, got {value}"));
    }

    Ok(value)
}
