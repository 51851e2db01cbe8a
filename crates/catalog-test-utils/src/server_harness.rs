//! Test server harness for E2E testing
//!
//! Provides `TestCatalogServer` for spawning real catalog server instances
//! in tests. The server uses the production router, auth chain and (by
//! default) the in-memory store.

use catalog_service::auth::{AuthGateway, JwksClient, JwtValidator};
use catalog_service::config::Config;
use catalog_service::observability::metrics::init_metrics_recorder;
use catalog_service::repositories::{CatalogStore, InMemoryCatalogStore};
use catalog_service::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Issuer the test server expects.
pub const TEST_ISSUER: &str = "https://issuer.catalog.test/";

/// Audience the test server expects.
pub const TEST_AUDIENCE: &str = "catalog-api";

/// The recorder can only be installed once per process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Options for `TestCatalogServer`.
///
/// # Example
/// ```rust,ignore
/// let server = TestCatalogServer::builder(jwks.url())
///     .algorithm("EdDSA")
///     .fetch_timeout_seconds(1)
///     .spawn()
///     .await?;
/// ```
pub struct TestServerBuilder {
    vars: HashMap<String, String>,
    store: Option<Arc<dyn CatalogStore>>,
}

impl TestServerBuilder {
    fn new(jwks_url: String) -> Self {
        let vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AUTH_ISSUER".to_string(), TEST_ISSUER.to_string()),
            ("AUTH_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("AUTH_JWKS_URL".to_string(), jwks_url),
        ]);
        Self { vars, store: None }
    }

    /// `RS256` (default) or `EdDSA`.
    pub fn algorithm(mut self, algorithm: &str) -> Self {
        self.vars
            .insert("JWT_ALGORITHM".to_string(), algorithm.to_string());
        self
    }

    pub fn fetch_timeout_seconds(mut self, seconds: u64) -> Self {
        self.vars.insert(
            "JWKS_FETCH_TIMEOUT_SECONDS".to_string(),
            seconds.to_string(),
        );
        self
    }

    pub fn request_timeout_seconds(mut self, seconds: u64) -> Self {
        self.vars
            .insert("REQUEST_TIMEOUT_SECONDS".to_string(), seconds.to_string());
        self
    }

    pub fn cache_ttl_seconds(mut self, seconds: u64) -> Self {
        self.vars
            .insert("JWKS_CACHE_TTL_SECONDS".to_string(), seconds.to_string());
        self
    }

    /// Use `store` instead of a fresh in-memory store.
    pub fn store(mut self, store: Arc<dyn CatalogStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Bind to a random port and start serving in the background.
    pub async fn spawn(self) -> Result<TestCatalogServer, anyhow::Error> {
        let config = Config::from_vars(&self.vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryCatalogStore::new()));

        let jwks_client = Arc::new(JwksClient::with_settings(
            config.jwks_url.clone(),
            config.jwks_cache_ttl(),
            config.jwks_fetch_timeout(),
        ));
        let validator = Arc::new(JwtValidator::new(jwks_client, config.validation_settings()));

        let state = Arc::new(AppState {
            store: Arc::clone(&store),
            config: config.clone(),
            gateway: Arc::new(AuthGateway::new(validator)),
        });

        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(TestCatalogServer {
            addr,
            config,
            store,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }
}

/// A running catalog server on a random local port.
pub struct TestCatalogServer {
    addr: SocketAddr,
    config: Config,
    store: Arc<dyn CatalogStore>,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestCatalogServer {
    /// Start configuring a server that fetches keys from `jwks_url`.
    pub fn builder(jwks_url: String) -> TestServerBuilder {
        TestServerBuilder::new(jwks_url)
    }

    /// Spawn with defaults: RS256, in-memory store.
    pub async fn spawn(jwks_url: String) -> Result<Self, anyhow::Error> {
        Self::builder(jwks_url).spawn().await
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The store behind the server, for seeding and inspecting state directly.
    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Send `method path` with an optional bearer token and JSON body.
    pub async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let mut request = self.client.request(method, format!("{}{}", self.url(), path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        Ok(request.send().await?)
    }
}

impl Drop for TestCatalogServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server =
            TestCatalogServer::spawn("http://127.0.0.1:9/.well-known/jwks.json".to_string())
                .await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert!(server.addr().ip().is_loopback());

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_builder_applies_settings() -> Result<(), anyhow::Error> {
        let server = TestCatalogServer::builder("http://127.0.0.1:9/jwks".to_string())
            .algorithm("EdDSA")
            .fetch_timeout_seconds(2)
            .cache_ttl_seconds(60)
            .request_timeout_seconds(4)
            .spawn()
            .await?;

        let config = server.config();
        assert_eq!(config.jwt_algorithm.as_str(), "EdDSA");
        assert_eq!(config.jwks_fetch_timeout_seconds, 2);
        assert_eq!(config.jwks_cache_ttl_seconds, 60);
        assert_eq!(config.request_timeout_seconds, 4);
        assert_eq!(config.auth_issuer, TEST_ISSUER);

        Ok(())
    }
}
