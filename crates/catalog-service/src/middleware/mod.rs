//! Middleware for the catalog service.
//!
//! # Components
//!
//! - `auth` - Per-route permission enforcement
//! - `http_metrics` - HTTP request metrics for every response
//! - `json_errors` - JSON body for error responses produced outside the handlers

pub mod auth;
pub mod http_metrics;
pub mod json_errors;

pub use auth::{require_permission, PermissionGuard};
pub use http_metrics::http_metrics_middleware;
pub use json_errors::json_error_responses;
