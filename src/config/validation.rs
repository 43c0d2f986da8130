//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. Validation is a pure
//! function `&IngressConfig -> Result<(), Vec<ValidationError>>` and reports
//! every problem it finds, not just the first.

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::IngressConfig;
use crate::routing::matcher::PathPattern;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.port must be non-zero")]
    ZeroPort,

    #[error("listener.max_body_bytes must be non-zero")]
    ZeroBodyLimit,

    #[error("listener.multipart_memory_bytes ({memory}) must not exceed listener.max_body_bytes ({body})")]
    MultipartBudgetExceedsBody { memory: usize, body: usize },

    #[error("listener.tls.{0} is required when TLS is enabled")]
    MissingTlsFile(&'static str),

    #[error("route {index}: invalid method {method:?}")]
    InvalidMethod { index: usize, method: String },

    #[error("route {index}: {reason}")]
    InvalidPath { index: usize, reason: String },

    #[error("route {index}: OPTIONS is reserved for CORS preflight")]
    ReservedMethod { index: usize },

    #[error("route {index}: duplicate route {method} {path}")]
    DuplicateRoute {
        index: usize,
        method: String,
        path: String,
    },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &IngressConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.listener.multipart_memory_bytes > config.listener.max_body_bytes {
        errors.push(ValidationError::MultipartBudgetExceedsBody {
            memory: config.listener.multipart_memory_bytes,
            body: config.listener.max_body_bytes,
        });
    }

    let tls = &config.listener.tls;
    if tls.enabled {
        if tls.cert_file.trim().is_empty() {
            errors.push(ValidationError::MissingTlsFile("cert_file"));
        }
        if tls.key_file.trim().is_empty() {
            errors.push(ValidationError::MissingTlsFile("key_file"));
        }
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        let method = route.method.to_ascii_uppercase();
        if axum::http::Method::from_bytes(method.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidMethod {
                index,
                method: route.method.clone(),
            });
            continue;
        }
        if method == "OPTIONS" {
            errors.push(ValidationError::ReservedMethod { index });
            continue;
        }

        let pattern = match PathPattern::parse(&route.path) {
            Ok(p) => p,
            Err(e) => {
                errors.push(ValidationError::InvalidPath {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if !seen.insert((method.clone(), pattern.shape())) {
            errors.push(ValidationError::DuplicateRoute {
                index,
                method,
                path: route.path.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
