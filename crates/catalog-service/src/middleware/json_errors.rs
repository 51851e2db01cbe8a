//! Renders bare error responses in the catalog error shape.
//!
//! Handlers already answer with `CatalogError` bodies, but the router and
//! the tower layers do not: a method mismatch is an empty 405 with `Allow`,
//! an oversized body is a plain-text 413 from the body limit, and a request
//! past its deadline is an empty 408 from `TimeoutLayer`. This layer swaps
//! any non-JSON 4xx/5xx body for the JSON error body and keeps `Allow`.
//!
//! It must sit outside `TimeoutLayer` to see the 408.

use crate::errors::CatalogError;
use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

pub async fn json_error_responses(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    tracing::debug!(
        target: "catalog.middleware.errors",
        status = status.as_u16(),
        "Rendering bare error response as JSON"
    );

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut rendered = CatalogError::from_status(status).into_response();
    if let Some(allow) = allow {
        rendered.headers_mut().insert(header::ALLOW, allow);
    }
    rendered
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, Bytes},
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::{get, post},
        Router,
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;
    use tower_http::timeout::TimeoutLayer;

    fn test_app() -> Router {
        Router::new()
            .route("/movies", get(|| async { "list" }))
            .route("/upload", post(|body: Bytes| async move { body.len().to_string() }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .route(
                "/teapot",
                get(|| async { (StatusCode::IM_A_TEAPOT, "short and stout") }),
            )
            .layer(TimeoutLayer::new(Duration::from_millis(50)))
            .layer(middleware::from_fn(json_error_responses))
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_method_mismatch_becomes_json() {
        let response = test_app()
            .oneshot(
                HttpRequest::builder()
                    .method("PUT")
                    .uri("/movies")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let allow = response
            .headers()
            .get(header::ALLOW)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(allow.contains("GET"));

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], 405);
        assert_eq!(body["message"], "method not allowed");
    }

    #[tokio::test]
    async fn test_oversized_body_becomes_json_413() {
        let response = test_app()
            .oneshot(
                HttpRequest::post("/upload")
                    .body(Body::from(vec![b'x'; 3 * 1024 * 1024]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = json_body(response).await;
        assert_eq!(
            body,
            serde_json::json!({"success": false, "error": 413, "message": "request body too large"})
        );
    }

    #[tokio::test]
    async fn test_timeout_becomes_json_408() {
        let response = test_app()
            .oneshot(HttpRequest::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body = json_body(response).await;
        assert_eq!(
            body,
            serde_json::json!({"success": false, "error": 408, "message": "request timed out"})
        );
    }

    #[tokio::test]
    async fn test_other_plain_errors_keep_status() {
        let response = test_app()
            .oneshot(HttpRequest::get("/teapot").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        let body = json_body(response).await;
        assert_eq!(body["error"], 418);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_json_errors_untouched() {
        let app = Router::new()
            .route(
                "/movies/:id",
                get(|| async { CatalogError::NotFound("movie not found".to_string()) }),
            )
            .layer(middleware::from_fn(json_error_responses));

        let response = app
            .oneshot(HttpRequest::get("/movies/9").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["message"], "movie not found");
    }

    #[tokio::test]
    async fn test_success_responses_untouched() {
        let response = test_app()
            .oneshot(HttpRequest::get("/movies").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"list");
    }
}
