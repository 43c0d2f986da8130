//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config
//! file. Every section has defaults so a minimal file only lists routes.

use serde::{Deserialize, Serialize};

/// Root configuration for the ingress server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IngressConfig {
    /// Listener configuration (address, limits, TLS).
    pub listener: ListenerConfig,

    /// Route definitions. Each one is bound to a handler at initialization.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Upper bound on a buffered request body in bytes.
    pub max_body_bytes: usize,

    /// Bytes of a multipart upload kept in memory before spilling to disk.
    /// Must not exceed `max_body_bytes`.
    pub multipart_memory_bytes: usize,

    /// TLS settings.
    pub tls: TlsConfig,
}

impl ListenerConfig {
    /// The `host:port` string handed to the socket layer.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
            multipart_memory_bytes: 2 * 1024 * 1024, // 2MB
            tls: TlsConfig::default(),
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Serve HTTPS instead of plain HTTP.
    pub enabled: bool,

    /// Path to certificate file (PEM).
    pub cert_file: String,

    /// Path to private key file (PEM).
    pub key_file: String,
}

/// A single route: HTTP method plus path pattern.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteConfig {
    /// HTTP method (case-insensitive, e.g. "get", "POST").
    pub method: String,

    /// Path pattern with optional `:name` and trailing `*name` segments.
    pub path: String,
}

impl RouteConfig {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
