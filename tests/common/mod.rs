//! Shared helpers for the integration tests.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::Method;
use axum::response::Response;
use pipework::Request;
use std::sync::{Arc, Mutex};

/// Request with an empty body, as handed to `Application::serve_http`.
pub fn request(method: Method, uri: &str) -> Request {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

pub fn get(uri: &str) -> Request {
    request(Method::GET, uri)
}

/// Request with a streaming body, as handed to the axum router.
pub fn transport_request(method: Method, uri: &str, body: impl Into<Body>) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap()
}

/// Collect a response body into a string.
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Ordered record of which handlers ran.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, step: impl Into<String>) {
        self.0.lock().unwrap().push(step.into());
    }

    pub fn steps(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}
