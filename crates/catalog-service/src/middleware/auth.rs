//! Per-route permission middleware.
//!
//! Each protected route is wrapped with its own `PermissionGuard` naming the
//! single permission it requires. The guard runs the full authorization chain
//! through `AuthGateway` and, on success, stores the verified claims in
//! request extensions for handlers.

use crate::auth::AuthGateway;
use crate::errors::CatalogError;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// State for `require_permission`: the gateway plus the permission this
/// route declares.
#[derive(Clone)]
pub struct PermissionGuard {
    pub gateway: Arc<AuthGateway>,
    pub permission: &'static str,
}

impl PermissionGuard {
    pub fn new(gateway: Arc<AuthGateway>, permission: &'static str) -> Self {
        Self {
            gateway,
            permission,
        }
    }
}

/// Authorize the request for the guard's permission.
///
/// # Response
///
/// - 401 with `WWW-Authenticate` when the header or token is unusable
/// - 403 when the token is valid but lacks the permission
/// - Otherwise continues to the handler with `Claims` in extensions
#[instrument(skip_all, name = "catalog.middleware.auth")]
pub async fn require_permission(
    State(guard): State<Arc<PermissionGuard>>,
    mut req: Request,
    next: Next,
) -> Result<Response, CatalogError> {
    let auth_header = req.headers().get(header::AUTHORIZATION).cloned();

    let claims = guard
        .gateway
        .authorize(auth_header.as_ref(), guard.permission)
        .await?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
