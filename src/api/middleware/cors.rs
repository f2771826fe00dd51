//! CORS middleware configuration
//!
//! Browser clients may be served from anywhere, so every origin is allowed
//! for the two methods the chat surface uses.

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

/// Create a CORS layer allowing any origin to use GET and POST
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let app = axum::Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer());

        for origin in ["http://localhost:3000", "https://chat.example.com"] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(Method::GET)
                        .uri("/")
                        .header("Origin", origin)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(
                response
                    .headers()
                    .get("access-control-allow-origin")
                    .unwrap()
                    .to_str()
                    .unwrap(),
                "*"
            );
        }
    }

    #[tokio::test]
    async fn test_cors_preflight_lists_get_and_post() {
        let app = axum::Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(cors_layer());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .header("Origin", "https://chat.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let methods = response
            .headers()
            .get("access-control-allow-methods")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("GET"));
        assert!(methods.contains("POST"));
        assert!(!methods.contains("DELETE"));
    }
}
