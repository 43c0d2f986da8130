//! HTTP ingress dispatcher library.
//!
//! Receives HTTP requests, answers CORS preflights, decodes bodies into a
//! content-type independent [`CanonicalRequest`], invokes the registered
//! [`Handler`] and encodes its reply.

// Core subsystems
pub mod config;
pub mod cors;
pub mod handler;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::IngressConfig;
pub use cors::CorsPolicy;
pub use handler::{handler_fn, EchoHandler, Handler, HandlerError, HandlerOutput, InvocationContext};
pub use http::{CanonicalRequest, ContentValue, FileDetail, Reply};
pub use lifecycle::{HandlerBinding, IngressServer, LifecycleError, LifecycleState};
