//! Per-request dispatch.
//!
//! # Responsibilities
//! - Resolve the route and answer 404 / 405 / preflight directly
//! - Build the canonical request (params, query, headers, decoded body)
//! - Invoke the handler and encode its reply
//!
//! # Design Decisions
//! - Stateless across requests; all shared state is immutable and `Arc`-wrapped
//! - Decode, handler and reply-mapping failures are all 400 with the error text
//! - No timeout, retry or queueing; cancellation is cooperative via the context

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{ALLOW, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::cors::{CorsNegotiator, PreflightRequest};
use crate::handler::{Handler, HandlerError, InvocationContext};
use crate::http::decode::{self, DecodeError, DecodeLimits};
use crate::http::request::{header_params, query_params, CanonicalRequest};
use crate::http::response::{bad_request, Reply, ReplyError};
use crate::observability::metrics;
use crate::routing::{Endpoint, PathParams, Resolution, RouteTable};

pub const X_REQUEST_ID: &str = "x-request-id";

const NOT_FOUND_BODY: &str = "No matching route found";

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub cors: Arc<CorsNegotiator>,
    pub limits: DecodeLimits,
    /// Flips to `true` when the server is stopped.
    pub cancel: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        routes: RouteTable,
        cors: CorsNegotiator,
        limits: DecodeLimits,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            routes: Arc::new(routes),
            cors: Arc::new(cors),
            limits,
            cancel,
        }
    }
}

/// Failure on the handler path. Rendered as a 400 with its text.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Handler(HandlerError),

    #[error(transparent)]
    Reply(#[from] ReplyError),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        bad_request(self.to_string())
    }
}

/// Fallback handler for every request the server receives.
pub async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Dispatching request");

    let response = match state.routes.resolve(&method, &path) {
        Resolution::NotFound => {
            tracing::warn!(request_id = %request_id, method = %method, path = %path, "No route matched");
            (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
        }
        Resolution::MethodNotAllowed { allowed } => method_not_allowed(&allowed),
        Resolution::Matched {
            endpoint: Endpoint::Preflight,
            ..
        } => preflight(&state.cors, request.headers()),
        Resolution::Matched {
            endpoint: Endpoint::Handler(handler),
            method: canonical,
            params,
            ..
        } => {
            let handler = Arc::clone(handler);
            let canonical = canonical.as_str().to_string();
            let ctx = InvocationContext::new(request_id.clone(), state.cancel.clone());
            invoke(&state, handler, ctx, canonical, params, request).await
        }
    };

    tracing::debug!(
        request_id = %request_id,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request complete"
    );
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

fn method_not_allowed(allowed: &[Method]) -> Response {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

fn preflight(cors: &CorsNegotiator, headers: &HeaderMap) -> Response {
    metrics::record_preflight();
    let mut response = StatusCode::OK.into_response();
    cors.preflight(&PreflightRequest::from_headers(headers))
        .apply(response.headers_mut());
    response
}

async fn invoke(
    state: &AppState,
    handler: Arc<dyn Handler>,
    ctx: InvocationContext,
    method: String,
    path_params: PathParams,
    request: Request<Body>,
) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let request_id = ctx.request_id().to_string();

    let mut response = match run_handler(state, handler, ctx, method, path_params, request).await {
        Ok(reply) => reply.into_response(),
        Err(e) => {
            if let DispatchError::Decode(decode_error) = &e {
                metrics::record_decode_error(decode_error.kind());
            }
            tracing::debug!(request_id = %request_id, error = %e, "Request failed");
            e.into_response()
        }
    };

    state
        .cors
        .actual_request_headers(origin.as_deref())
        .apply(response.headers_mut());
    response
}

async fn run_handler(
    state: &AppState,
    handler: Arc<dyn Handler>,
    ctx: InvocationContext,
    method: String,
    path_params: PathParams,
    request: Request<Body>,
) -> Result<Reply, DispatchError> {
    let (parts, body) = request.into_parts();

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let content = decode::decode_body(content_type, body, &state.limits).await?;

    let canonical = CanonicalRequest {
        method,
        path_params,
        query_params: query_params(parts.uri.query()),
        headers: header_params(&parts.headers),
        content,
    };

    let output = handler
        .handle(ctx, canonical)
        .await
        .map_err(DispatchError::Handler)?;
    Ok(Reply::from_map(output)?)
}
