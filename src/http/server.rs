//! HTTP application assembly.
//!
//! # Responsibilities
//! - Create the Axum router with the dispatcher as its only handler
//! - Wire up middleware (request ID, tracing)
//!
//! Binding and serving live in [`crate::lifecycle`]; this module only
//! produces the service.

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::http::dispatch::{dispatch, AppState, X_REQUEST_ID};

/// Build the Axum router for `state`.
///
/// Every path and method reaches [`dispatch`]; routing is done by the
/// route table so 404/405 keep the ingress's own semantics.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
