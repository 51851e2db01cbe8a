//! Catalog Service Library
//!
//! HTTP service for a movie/actor catalog gated by externally issued bearer
//! tokens. The interesting part is the authorization chain:
//!
//! ```text
//! Authorization header -> bearer::extract_bearer_token
//!                      -> jwt::JwtValidator (jwks::JwksClient for keys)
//!                      -> permissions::check_permission
//!                      -> gateway::AuthGateway (401/403 translation)
//! ```
//!
//! Handlers follow the Handler -> Repository pattern:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> repositories/*.rs (CatalogStore)
//! ```
//!
//! # Modules
//!
//! - `auth` - Token parsing, JWKS cache, signature and permission checks
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Per-route permission enforcement and HTTP metrics
//! - `models` - Entities, projections, and request validation
//! - `observability` - Prometheus metrics
//! - `repositories` - `CatalogStore` with Postgres and in-memory backends
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
