// Not every helper is used in every test, so we allow dead code
#![allow(dead_code)]

use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use http_body_util::BodyExt;
use image_storage::{environment::ServiceConfig, object_store::InMemoryObjectStore};
use tower::ServiceExt;
use url_issuer::{issuer::UrlIssuer, server};

pub const PROCESSED_BUCKET: &str = "processed-images";

/// Router wired to an in-memory object store
pub struct TestSetup {
    pub router: Router,
    pub store: Arc<InMemoryObjectStore>,
}

impl TestSetup {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryObjectStore::new());
        let issuer = Arc::new(UrlIssuer::new(store.clone(), &ServiceConfig::default()));

        Self {
            router: server::router(issuer),
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn send_post_request(&self, route: &str, body: impl Into<Body>) -> Response {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/json")
            .body(body.into())
            .unwrap();
        self.send(request).await
    }

    pub async fn send_get_request(&self, route: &str) -> Response {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Asserts the fixed CORS header set is present
pub fn assert_cors_headers(response: &Response) {
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    assert_eq!(headers["access-control-allow-methods"], "OPTIONS,POST,GET");
}
