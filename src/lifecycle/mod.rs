//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     new(config) → initialize(bindings, cors) → start() → Running
//!
//! Shutdown (shutdown.rs):
//!     stop() → trigger cancellation → close listener and connections → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls stop()
//! ```
//!
//! # Design Decisions
//! - States only move forward: Created → Initialized → Running → Stopped
//! - Stopped is terminal; a new server is built to serve again

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{HandlerBinding, IngressServer, LifecycleError, LifecycleState};
