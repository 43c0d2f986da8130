//! Route table construction and lookup.
//!
//! # Responsibilities
//! - Register (method, pattern, handler) triples at startup
//! - Register exactly one CORS preflight responder per distinct path
//! - Resolve (method, path) to an endpoint plus bound path parameters
//!
//! # Design Decisions
//! - Built once through [`RouteTableBuilder`], then frozen; lookups take no locks
//! - Duplicate (method, path shape) registrations are rejected at startup
//! - `OPTIONS` is reserved for the preflight responder
//! - Explicit NotFound / MethodNotAllowed rather than a silent default

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;

use crate::handler::Handler;
use crate::routing::matcher::{PathParams, PathPattern, PatternError};

/// Route registration failure.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("OPTIONS {0} is reserved for CORS preflight")]
    ReservedMethod(String),

    #[error("duplicate route {method} {path}")]
    Duplicate { method: Method, path: String },
}

/// What a resolved route dispatches to.
#[derive(Clone)]
pub enum Endpoint {
    /// The auto-registered CORS preflight responder.
    Preflight,
    /// A registered business-logic handler.
    Handler(Arc<dyn Handler>),
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Preflight => f.write_str("Preflight"),
            Endpoint::Handler(_) => f.write_str("Handler(<dyn Handler>)"),
        }
    }
}

/// Outcome of a route lookup.
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched {
        endpoint: &'a Endpoint,
        /// The canonical (uppercased) method the route was registered under.
        method: &'a Method,
        pattern: &'a PathPattern,
        params: PathParams,
    },
    /// The path exists but not for this method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// All endpoints sharing one path shape.
#[derive(Debug)]
struct PathEntry {
    pattern: PathPattern,
    endpoints: BTreeMap<String, (Method, Endpoint)>,
}

/// Immutable route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<PathEntry>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Resolve a request. Among the paths registered for the method, the
    /// most specific match wins.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let candidates: Vec<(&PathEntry, PathParams)> = self
            .entries
            .iter()
            .filter_map(|entry| entry.pattern.matches(path).map(|params| (entry, params)))
            .collect();

        if candidates.is_empty() {
            return Resolution::NotFound;
        }

        let (serving, others): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|(entry, _)| entry.endpoints.contains_key(method.as_str()));

        let best = serving
            .into_iter()
            .max_by(|(a, _), (b, _)| a.pattern.specificity_cmp(&b.pattern));

        match best.and_then(|(entry, params)| {
            entry
                .endpoints
                .get(method.as_str())
                .map(|(method, endpoint)| (entry, method, endpoint, params))
        }) {
            Some((entry, method, endpoint, params)) => Resolution::Matched {
                endpoint,
                method,
                pattern: &entry.pattern,
                params,
            },
            None => {
                let allowed: BTreeMap<&str, &Method> = others
                    .iter()
                    .flat_map(|(entry, _)| entry.endpoints.iter().map(|(k, (m, _))| (k.as_str(), m)))
                    .collect();
                Resolution::MethodNotAllowed {
                    allowed: allowed.into_values().cloned().collect(),
                }
            }
        }
    }

    /// Every registered (method, pattern) pair, preflights included.
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry
                    .endpoints
                    .values()
                    .map(move |(m, _)| (m.clone(), entry.pattern.to_string()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.endpoints.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mutable builder; consumed by [`RouteTableBuilder::build`].
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    entries: Vec<PathEntry>,
}

impl RouteTableBuilder {
    /// Register a handler for `method` on `pattern`.
    ///
    /// The first registration of a path also registers its preflight
    /// responder; later registrations on the same path reuse it.
    pub fn route(
        &mut self,
        method: &str,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, RouteError> {
        let upper = method.to_ascii_uppercase();
        let method = Method::from_bytes(upper.as_bytes())
            .map_err(|_| RouteError::InvalidMethod(method.to_string()))?;
        if method == Method::OPTIONS {
            return Err(RouteError::ReservedMethod(pattern.to_string()));
        }

        let pattern = PathPattern::parse(pattern)?;
        let shape = pattern.shape();

        let index = match self.entries.iter().position(|e| e.pattern.shape() == shape) {
            Some(index) => index,
            None => {
                tracing::debug!(path = %pattern, "Registering CORS preflight");
                let mut endpoints = BTreeMap::new();
                endpoints.insert(
                    Method::OPTIONS.as_str().to_string(),
                    (Method::OPTIONS, Endpoint::Preflight),
                );
                self.entries.push(PathEntry {
                    pattern: pattern.clone(),
                    endpoints,
                });
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[index];
        if entry.endpoints.contains_key(method.as_str()) {
            return Err(RouteError::Duplicate {
                method,
                path: pattern.to_string(),
            });
        }

        tracing::debug!(method = %method, path = %pattern, "Registering handler");
        entry
            .endpoints
            .insert(method.as_str().to_string(), (method, Endpoint::Handler(handler)));
        Ok(self)
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            entries: self.entries,
        }
    }
}
