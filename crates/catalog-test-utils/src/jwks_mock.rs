//! Mock key set endpoint backed by wiremock.

use crate::crypto_fixtures::TestKey;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves the key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A running key set endpoint.
///
/// # Example
/// ```rust,ignore
/// let jwks = MockJwks::start(&[&key]).await;
/// // ... later, simulate rotation:
/// jwks.serve(&[&new_key]).await;
/// assert_eq!(jwks.fetch_count().await, 2);
/// ```
pub struct MockJwks {
    server: MockServer,
    /// Fetches recorded before the last `reset`, which clears the journal.
    earlier_fetches: AtomicUsize,
}

impl MockJwks {
    fn new(server: MockServer) -> Self {
        Self {
            server,
            earlier_fetches: AtomicUsize::new(0),
        }
    }

    /// Start a server publishing `keys`.
    pub async fn start(keys: &[&TestKey]) -> Self {
        let mock = Self::new(MockServer::start().await);
        mock.serve(keys).await;
        mock
    }

    /// Start a server that answers every fetch with `status` and no key set.
    pub async fn start_failing(status: u16) -> Self {
        let mock = Self::new(MockServer::start().await);
        mock.mount(ResponseTemplate::new(status)).await;
        mock
    }

    /// Start a server that publishes `keys` only after `delay`.
    pub async fn start_hanging(keys: &[&TestKey], delay: Duration) -> Self {
        let mock = Self::new(MockServer::start().await);
        mock.mount(
            ResponseTemplate::new(200)
                .set_body_json(key_set(keys))
                .set_delay(delay),
        )
        .await;
        mock
    }

    /// Replace the published key set.
    pub async fn serve(&self, keys: &[&TestKey]) {
        self.replace(ResponseTemplate::new(200).set_body_json(key_set(keys)))
            .await;
    }

    /// Publish a raw document, for malformed-key-set cases.
    pub async fn serve_raw(&self, body: serde_json::Value) {
        self.replace(ResponseTemplate::new(200).set_body_json(body))
            .await;
    }

    /// Full key set URL to configure the service with.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of key set fetches since the server started.
    pub async fn fetch_count(&self) -> usize {
        self.earlier_fetches.load(Ordering::SeqCst) + self.recorded_fetches().await
    }

    async fn recorded_fetches(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }

    async fn replace(&self, response: ResponseTemplate) {
        let recorded = self.recorded_fetches().await;
        self.earlier_fetches.fetch_add(recorded, Ordering::SeqCst);
        self.server.reset().await;
        self.mount(response).await;
    }

    async fn mount(&self, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}

fn key_set(keys: &[&TestKey]) -> serde_json::Value {
    serde_json::json!({
        "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>()
    })
}
