//! Shared utilities for integration tests.

use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use rest_ingress::config::{IngressConfig, RouteConfig};
use rest_ingress::cors::CorsPolicy;
use rest_ingress::handler::{handler_fn, Handler, HandlerError, HandlerOutput};
use rest_ingress::http::CanonicalRequest;
use rest_ingress::lifecycle::{HandlerBinding, IngressServer};

#[allow(dead_code)]
pub const BOUNDARY: &str = "test-boundary-7MA4YWxk";

/// A buffered response.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Handler that records every canonical request and replies with a fixed map.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Recorder {
    pub seen: Arc<Mutex<Vec<CanonicalRequest>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn replying(&self, reply: Value) -> Arc<dyn Handler> {
        let seen = self.seen.clone();
        Arc::new(handler_fn(move |_ctx, request| {
            let seen = seen.clone();
            let reply = reply.clone();
            async move {
                seen.lock().unwrap().push(request);
                match reply {
                    Value::Object(map) => Ok::<HandlerOutput, HandlerError>(map),
                    _ => Ok(HandlerOutput::new()),
                }
            }
        }))
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last(&self) -> CanonicalRequest {
        self.seen.lock().unwrap().last().cloned().expect("handler was not invoked")
    }
}

#[allow(dead_code)]
pub fn binding(method: &str, path: &str, handler: Arc<dyn Handler>) -> HandlerBinding {
    HandlerBinding::new(RouteConfig::new(method, path), handler)
}

/// Build the fully layered router for `bindings`.
#[allow(dead_code)]
pub fn app_with(bindings: Vec<HandlerBinding>, cors: CorsPolicy) -> Router {
    let mut server = IngressServer::new(IngressConfig::default());
    server.initialize(bindings, cors).unwrap();
    server.router().unwrap()
}

#[allow(dead_code)]
pub fn app(bindings: Vec<HandlerBinding>) -> Router {
    app_with(bindings, CorsPolicy::default())
}

/// Drive one request through the router.
#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse { status, headers, body }
}

#[allow(dead_code)]
pub fn request(method: &str, uri: &str, content_type: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    builder.body(body.into()).unwrap()
}

/// Build a multipart body from `(field, filename, content type, bytes)` parts.
#[allow(dead_code)]
pub fn multipart_body(parts: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, file_name, content_type, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", field);
        if let Some(file_name) = file_name {
            disposition.push_str(&format!("; filename=\"{}\"", file_name));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

#[allow(dead_code)]
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
