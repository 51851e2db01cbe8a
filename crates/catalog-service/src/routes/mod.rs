//! HTTP routes for the catalog service.
//!
//! Defines the Axum router and application state.

use crate::auth::AuthGateway;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{
    http_metrics_middleware, json_error_responses, require_permission, PermissionGuard,
};
use crate::repositories::CatalogStore;
use axum::{
    middleware,
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Catalog storage backend.
    pub store: Arc<dyn CatalogStore>,

    /// Service configuration.
    pub config: Config,

    /// Authorization chain shared by every permission guard.
    pub gateway: Arc<AuthGateway>,
}

/// Wrap a method router so it only runs for callers holding `permission`.
fn guarded(
    route: MethodRouter<Arc<AppState>>,
    gateway: &Arc<AuthGateway>,
    permission: &'static str,
) -> MethodRouter<Arc<AppState>> {
    let guard = Arc::new(PermissionGuard::new(Arc::clone(gateway), permission));
    route.route_layer(middleware::from_fn_with_state(guard, require_permission))
}

/// Build the application routes.
///
/// - `/health`, `/ready`, `/metrics` - public operational endpoints
/// - `/movies`, `/movies/:id` - `get:movies`, `post:movies`, `patch:movies`, `delete:movies`
/// - `/actors`, `/actors/:id` - `get:actors`, `post:actors`, `patch:actors`, `delete:actors`
/// - `/roles`, `/roles/:id` - `get:roles`, `post:roles`, `delete:roles`
///
/// Unknown paths get a JSON 404; a known path with the wrong method gets a
/// JSON 405 with `Allow`. Oversized bodies and requests past
/// `REQUEST_TIMEOUT_SECONDS` get a JSON 413 and 408.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let gateway = Arc::clone(&state.gateway);
    let request_timeout = state.config.request_timeout();

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let catalog_routes = Router::new()
        .route(
            "/movies",
            guarded(get(handlers::list_movies), &gateway, "get:movies").merge(guarded(
                post(handlers::create_movie),
                &gateway,
                "post:movies",
            )),
        )
        .route(
            "/movies/:id",
            guarded(get(handlers::get_movie), &gateway, "get:movies")
                .merge(guarded(
                    patch(handlers::update_movie),
                    &gateway,
                    "patch:movies",
                ))
                .merge(guarded(
                    delete(handlers::delete_movie),
                    &gateway,
                    "delete:movies",
                )),
        )
        .route(
            "/actors",
            guarded(get(handlers::list_actors), &gateway, "get:actors").merge(guarded(
                post(handlers::create_actor),
                &gateway,
                "post:actors",
            )),
        )
        .route(
            "/actors/:id",
            guarded(get(handlers::get_actor), &gateway, "get:actors")
                .merge(guarded(
                    patch(handlers::update_actor),
                    &gateway,
                    "patch:actors",
                ))
                .merge(guarded(
                    delete(handlers::delete_actor),
                    &gateway,
                    "delete:actors",
                )),
        )
        .route(
            "/roles",
            guarded(get(handlers::list_roles), &gateway, "get:roles").merge(guarded(
                post(handlers::create_role),
                &gateway,
                "post:roles",
            )),
        )
        .route(
            "/roles/:id",
            guarded(delete(handlers::delete_role), &gateway, "delete:roles"),
        )
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TraceLayer - Log request details
    // 2. TimeoutLayer - Timeout the request
    // 3. json_error_responses - Render bare 405/408/413 responses as JSON
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(catalog_routes)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(json_error_responses))
        .layer(middleware::from_fn(http_metrics_middleware))
}
