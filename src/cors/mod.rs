//! Cross-origin resource sharing.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     REST_INGRESS_* environment
//!     → policy.rs (CorsPolicy, validated once)
//!     → negotiator.rs (CorsNegotiator, shared via Arc)
//!
//! Per request:
//!     OPTIONS → negotiator.preflight() → headers only, 200
//!     other   → negotiator.actual_request_headers() → attached to the reply
//! ```

pub mod negotiator;
pub mod policy;

pub use negotiator::{CorsHeaders, CorsNegotiator, PreflightRequest};
pub use policy::{AllowedOrigins, CorsConfigError, CorsPolicy, CORS_PREFIX};
