//! # Catalog Test Utilities
//!
//! Shared test utilities for the catalog service:
//! - `crypto_fixtures` - deterministic Ed25519 and RSA signing keys with their JWKs
//! - `token_builders` - `TestTokenBuilder` for claims, signed with a fixture key
//! - `jwks_mock` - wiremock-backed key set endpoint
//! - `server_harness` - `TestCatalogServer` running the real router on a random port
//!
//! ## Usage
//!
//! ```rust,ignore
//! use catalog_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let key = TestKey::rsa("key-1");
//!     let jwks = MockJwks::start(&[&key]).await;
//!     let server = TestCatalogServer::builder(jwks.url()).spawn().await?;
//!
//!     let token = TestTokenBuilder::new()
//!         .with_permissions(&["get:movies"])
//!         .sign(&key);
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/movies", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;
