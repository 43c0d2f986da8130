//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (axum-server)
//!     → server.rs (Axum router, request ID + trace layers)
//!     → dispatch.rs (route lookup, preflight, 404/405)
//!     → decode.rs / multipart.rs (body → ContentValue)
//!     → request.rs (CanonicalRequest)
//!     → Handler
//!     → response.rs (Reply → status, content type, body)
//!     → Send to client
//! ```

pub mod decode;
pub mod dispatch;
pub mod multipart;
pub mod request;
pub mod response;
pub mod server;

pub use decode::{DecodeError, DecodeLimits};
pub use dispatch::{dispatch, AppState, DispatchError, X_REQUEST_ID};
pub use request::{CanonicalRequest, ContentValue, FileDetail};
pub use response::{EncodedReply, Reply, ReplyError, ResponseBody};
pub use server::build_router;
