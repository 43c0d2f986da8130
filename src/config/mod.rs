//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → IngressConfig (validated, immutable)
//!     → handed to IngressServer at construction
//!
//! CORS policy (environment, REST_INGRESS_*)
//!     → cors::CorsPolicy::from_env (resolved once at startup)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; routes cannot change while running
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::IngressConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::RouteConfig;
pub use schema::TlsConfig;
