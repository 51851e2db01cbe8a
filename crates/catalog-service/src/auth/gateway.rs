//! Authorization gateway.
//!
//! Runs token extraction, verification and the permission check as one
//! decision, and is the single place where `AuthError` becomes an HTTP-facing
//! `AuthorizationError`.

use crate::auth::bearer::extract_bearer_token;
use crate::auth::claims::Claims;
use crate::auth::jwt::JwtValidator;
use crate::auth::permissions::check_permission;
use crate::auth::AuthError;
use crate::observability::metrics::record_auth_decision;
use axum::http::HeaderValue;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// A failed authorization decision, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationError {
    /// 401 or 403.
    pub status: u16,

    /// Stable machine-readable code, e.g. `token_expired`.
    pub code: &'static str,

    /// Human-readable description safe to return to clients.
    pub description: String,
}

impl From<AuthError> for AuthorizationError {
    fn from(err: AuthError) -> Self {
        Self {
            status: err.status_code(),
            code: err.code(),
            description: err.to_string(),
        }
    }
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.code, self.description)
    }
}

impl std::error::Error for AuthorizationError {}

/// Orchestrates the authorization chain for a single request.
pub struct AuthGateway {
    validator: Arc<JwtValidator>,
}

impl AuthGateway {
    pub fn new(validator: Arc<JwtValidator>) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &Arc<JwtValidator> {
        &self.validator
    }

    /// Decide whether a request carrying `header` may exercise `required_permission`.
    ///
    /// Short-circuits on the first failing step.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizationError` with status 401 for missing, malformed or
    /// unverifiable tokens and 403 for valid tokens lacking the permission.
    #[instrument(skip(self, header), fields(permission = %required_permission))]
    pub async fn authorize(
        &self,
        header: Option<&HeaderValue>,
        required_permission: &str,
    ) -> Result<Claims, AuthorizationError> {
        match self.decide(header, required_permission).await {
            Ok(claims) => {
                tracing::debug!(
                    target: "catalog.auth.gateway",
                    permission = %required_permission,
                    "Request authorized"
                );
                record_auth_decision("allowed", "none");
                Ok(claims)
            }
            Err(err) => {
                if err == AuthError::KeySetUnavailable {
                    tracing::warn!(
                        target: "catalog.auth.gateway",
                        permission = %required_permission,
                        "Request denied: key set unavailable"
                    );
                } else {
                    tracing::info!(
                        target: "catalog.auth.gateway",
                        permission = %required_permission,
                        reason = err.code(),
                        status = err.status_code(),
                        "Request denied"
                    );
                }
                record_auth_decision("denied", err.code());
                Err(err.into())
            }
        }
    }

    async fn decide(
        &self,
        header: Option<&HeaderValue>,
        required_permission: &str,
    ) -> Result<Claims, AuthError> {
        let token = extract_bearer_token(header)?;
        let claims = self.validator.validate(token).await?;
        check_permission(&claims, required_permission)?;
        Ok(claims)
    }
}
