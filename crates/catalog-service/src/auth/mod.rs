//! Authentication and authorization for the catalog service.
//!
//! # Components
//!
//! - `bearer` - `Authorization: Bearer` header parsing
//! - `claims` - Verified token claims
//! - `jwks` - Issuer key set fetching and caching
//! - `jwt` - Signature verification and claim checks
//! - `permissions` - Required-permission check
//! - `gateway` - The full decision, translated to 401/403

pub mod bearer;
pub mod claims;
pub mod error;
pub mod gateway;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::{Audience, Claims};
pub use error::AuthError;
pub use gateway::{AuthGateway, AuthorizationError};
pub use jwks::JwksClient;
pub use jwt::{JwtValidator, TokenAlgorithm, ValidationSettings};
