//! Catalog Service
//!
//! Movie/actor catalog behind bearer-token authorization.

use catalog_service::auth::{AuthGateway, JwksClient, JwtValidator};
use catalog_service::config::Config;
use catalog_service::observability::metrics::init_metrics_recorder;
use catalog_service::repositories::{CatalogStore, InMemoryCatalogStore, PgCatalogStore};
use catalog_service::routes::{self, AppState};
use common::secret::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Catalog Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        issuer = %config.auth_issuer,
        audience = %config.auth_audience,
        jwks_url = %config.jwks_url,
        algorithm = %config.jwt_algorithm,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );

    // Must happen before any metric is recorded
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let store: Arc<dyn CatalogStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let url_with_timeout = add_query_timeout(database_url.expose_secret(), 5);
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(20)
                .min_connections(2)
                .acquire_timeout(Duration::from_secs(5))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
                .connect(&url_with_timeout)
                .await
                .map_err(|e| {
                    error!("Failed to connect to database: {}", e);
                    e
                })?;

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    error!("Failed to apply migrations: {}", e);
                    e
                })?;

            info!("Database connection established");
            Arc::new(PgCatalogStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory catalog store");
            Arc::new(InMemoryCatalogStore::new())
        }
    };

    let jwks_client = Arc::new(JwksClient::with_settings(
        config.jwks_url.clone(),
        config.jwks_cache_ttl(),
        config.jwks_fetch_timeout(),
    ));
    let validator = Arc::new(JwtValidator::new(jwks_client, config.validation_settings()));
    let gateway = Arc::new(AuthGateway::new(validator));

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState {
        store: Arc::clone(&store),
        config,
        gateway,
    });

    let app = routes::build_routes(state, metrics_handle);

    info!("Catalog Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    store.close().await;

    info!("Catalog Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("CATALOG_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (CATALOG_DRAIN_SECONDS=0)");
    }
}

/// Adds statement_timeout to the database URL so queries cannot hang
/// indefinitely.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}options=-c%20statement_timeout%3D{}s",
        url, separator, timeout_secs
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_query_timeout() {
        assert_eq!(
            add_query_timeout("postgres://db/catalog", 5),
            "postgres://db/catalog?options=-c%20statement_timeout%3D5s"
        );
        assert_eq!(
            add_query_timeout("postgres://db/catalog?sslmode=require", 5),
            "postgres://db/catalog?sslmode=require&options=-c%20statement_timeout%3D5s"
        );
    }
}
