//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment match, parameter binding)
//!     → Return: Matched endpoint | MethodNotAllowed | NotFound
//!
//! Route Compilation (at startup):
//!     (method, pattern, handler)[]
//!     → Parse patterns, reject duplicates
//!     → Add one OPTIONS preflight per distinct path
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: most specific pattern wins

pub mod matcher;
pub mod router;

pub use matcher::{PathParams, PathPattern, PatternError};
pub use router::{Endpoint, Resolution, RouteError, RouteTable, RouteTableBuilder};
