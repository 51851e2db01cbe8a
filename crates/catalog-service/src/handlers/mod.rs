//! HTTP request handlers for the catalog service.
//!
//! Handlers receive an already-authorized request (see
//! `middleware::require_permission`), parse and validate input, and delegate
//! to the `CatalogStore`.

pub mod actors;
pub mod health;
pub mod metrics;
pub mod movies;
pub mod roles;

pub use actors::{create_actor, delete_actor, get_actor, list_actors, update_actor};
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use movies::{create_movie, delete_movie, get_movie, list_movies, update_movie};
pub use roles::{create_role, delete_role, list_roles};

use crate::errors::CatalogError;
use serde::de::DeserializeOwned;

/// Fallback for paths no route matches.
pub async fn not_found() -> CatalogError {
    CatalogError::NotFound("resource not found".to_string())
}

/// Parse a JSON object body into `T`.
///
/// Unparseable JSON, or JSON that is not an object, is a 400. A well-formed
/// object whose fields have the wrong types is a 422.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, CatalogError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| CatalogError::BadRequest("request body must be valid JSON".to_string()))?;

    if !value.is_object() {
        return Err(CatalogError::BadRequest(
            "request body must be a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| CatalogError::Unprocessable(e.to_string()))
}

/// Parse a path identifier. Ids are positive integers.
pub(crate) fn parse_id(raw: &str) -> Result<i64, CatalogError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CatalogError::BadRequest(format!("invalid identifier: {raw}"))),
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::CreateMovieRequest;

    #[test]
    fn test_parse_body_rejects_invalid_json() {
        let err = parse_body::<CreateMovieRequest>(b"{not json").unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = parse_body::<CreateMovieRequest>(b"").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_parse_body_rejects_non_object() {
        let err = parse_body::<CreateMovieRequest>(b"[1, 2]").unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = parse_body::<CreateMovieRequest>(b"\"title\"").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_parse_body_wrong_field_type_is_unprocessable() {
        let err = parse_body::<CreateMovieRequest>(br#"{"title": 42}"#).unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_parse_body_ignores_unknown_fields() {
        let request =
            parse_body::<CreateMovieRequest>(br#"{"title": "Heat", "rating": 5}"#).unwrap();
        assert_eq!(request.title.as_deref(), Some("Heat"));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("17").unwrap(), 17);
        assert_eq!(parse_id("abc").unwrap_err().status_code(), 400);
        assert_eq!(parse_id("0").unwrap_err().status_code(), 400);
        assert_eq!(parse_id("-3").unwrap_err().status_code(), 400);
        assert_eq!(parse_id("1.5").unwrap_err().status_code(), 400);
    }

    #[tokio::test]
    async fn test_not_found_fallback() {
        assert_eq!(not_found().await.status_code(), 404);
    }
}
