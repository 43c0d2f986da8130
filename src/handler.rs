//! Business-logic handler seam.
//!
//! Handlers are injected as trait objects when a route is registered. The
//! dispatcher calls [`Handler::handle`] once per non-preflight request with
//! the canonical request and an [`InvocationContext`].

use std::future::Future;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::watch;

use crate::http::request::CanonicalRequest;

/// The loosely-typed result mapping a handler returns.
///
/// The dispatcher reads the `code` and `data` keys; see [`crate::http::Reply`].
pub type HandlerOutput = Map<String, Value>;

/// Failure reported by a handler. Its `Display` text becomes the 400 body.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// External unit of business logic.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        ctx: InvocationContext,
        request: CanonicalRequest,
    ) -> Result<HandlerOutput, HandlerError>;
}

/// Per-invocation context.
///
/// Carries the request id and a cancellation signal that fires when the
/// server is stopped. The dispatcher itself never imposes a timeout.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    request_id: String,
    cancel: watch::Receiver<bool>,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>, cancel: watch::Receiver<bool>) -> Self {
        Self {
            request_id: request_id.into(),
            cancel,
        }
    }

    /// A context that is never cancelled.
    pub fn detached(request_id: impl Into<String>) -> Self {
        let (_tx, rx) = watch::channel(false);
        Self::new(request_id, rx)
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolves once the context is cancelled. Pends forever if the
    /// cancelling side is gone without having fired.
    pub async fn cancelled(&mut self) {
        if self.cancel.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Adapter turning an async closure into a [`Handler`].
pub struct FnHandler<F>(F);

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(InvocationContext, CanonicalRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput, HandlerError>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(InvocationContext, CanonicalRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutput, HandlerError>> + Send + 'static,
{
    async fn handle(
        &self,
        ctx: InvocationContext,
        request: CanonicalRequest,
    ) -> Result<HandlerOutput, HandlerError> {
        (self.0)(ctx, request).await
    }
}

/// Replies with the canonical request it received, as JSON data.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(
        &self,
        ctx: InvocationContext,
        request: CanonicalRequest,
    ) -> Result<HandlerOutput, HandlerError> {
        tracing::debug!(request_id = %ctx.request_id(), method = %request.method, "Echoing request");
        let mut out = HandlerOutput::new();
        out.insert("code".to_string(), json!(200));
        out.insert("data".to_string(), serde_json::to_value(&request)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::ContentValue;
    use std::collections::HashMap;

    fn request() -> CanonicalRequest {
        CanonicalRequest {
            method: "GET".into(),
            path_params: HashMap::from([("id".to_string(), "7".to_string())]),
            query_params: HashMap::new(),
            headers: HashMap::new(),
            content: ContentValue::Empty,
        }
    }

    #[tokio::test]
    async fn echo_returns_request_as_data() {
        let out = EchoHandler
            .handle(InvocationContext::detached("req-1"), request())
            .await
            .unwrap();

        assert_eq!(out["code"], 200);
        assert_eq!(out["data"]["method"], "GET");
        assert_eq!(out["data"]["path_params"]["id"], "7");
    }

    #[tokio::test]
    async fn fn_handler_forwards_errors() {
        let h = handler_fn(|_ctx, _req| async { Err::<HandlerOutput, HandlerError>("nope".into()) });
        let err = h
            .handle(InvocationContext::detached("req-2"), request())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[tokio::test]
    async fn context_observes_cancellation() {
        let (tx, rx) = watch::channel(false);
        let mut ctx = InvocationContext::new("req-3", rx);
        assert!(!ctx.is_cancelled());

        tx.send(true).unwrap();
        ctx.cancelled().await;
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn detached_context_is_never_cancelled() {
        assert!(!InvocationContext::detached("req-4").is_cancelled());
    }
}
