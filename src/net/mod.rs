//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig
//!     → listener.rs (host:port → SocketAddr)
//!     → tls.rs (optional PEM credentials → RustlsConfig)
//!     → lifecycle (axum-server bind / bind_rustls)
//! ```
//!
//! # Design Decisions
//! - TLS credentials are loaded before binding; a bad certificate never opens a socket
//! - TLS is optional and handled transparently by axum-server

pub mod listener;
pub mod tls;

pub use listener::resolve_bind_address;
pub use tls::load_tls_config;
