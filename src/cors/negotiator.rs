//! CORS header negotiation.
//!
//! # Responsibilities
//! - Answer preflight (OPTIONS) requests from the policy alone
//! - Compute the allow-origin headers attached to every other response
//!
//! # Design Decisions
//! - Pure function of (policy, request headers); no per-request state
//! - A disallowed origin, method or header yields no allow headers, never an error
//! - Wildcard policies answer `*`; explicit lists echo the origin with `Vary: Origin`

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::cors::policy::{split_list, CorsPolicy};

/// The CORS-relevant parts of a preflight request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightRequest {
    pub origin: Option<String>,
    pub method: Option<String>,
    pub headers: Vec<String>,
}

impl PreflightRequest {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        Self {
            origin: text(&ORIGIN),
            method: text(&ACCESS_CONTROL_REQUEST_METHOD),
            headers: headers
                .get_all(ACCESS_CONTROL_REQUEST_HEADERS)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(split_list)
                .collect(),
        }
    }
}

/// Header pairs to write on a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsHeaders(Vec<(HeaderName, HeaderValue)>);

impl CorsHeaders {
    fn push(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => self.0.push((name, value)),
            Err(_) => tracing::debug!(header = %name, value, "Skipping unrepresentable CORS header"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &HeaderName) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.to_str().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderName, HeaderValue)> {
        self.0.iter()
    }

    /// Write every pair into `headers`, replacing existing values.
    pub fn apply(self, headers: &mut HeaderMap) {
        for (name, value) in self.0 {
            headers.insert(name, value);
        }
    }
}

/// Computes CORS response headers from an immutable policy.
#[derive(Debug, Clone, Default)]
pub struct CorsNegotiator {
    policy: CorsPolicy,
}

impl CorsNegotiator {
    pub fn new(policy: CorsPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CorsPolicy {
        &self.policy
    }

    /// Answer a preflight request.
    pub fn preflight(&self, request: &PreflightRequest) -> CorsHeaders {
        let mut out = CorsHeaders::default();

        let Some(origin) = request.origin.as_deref() else {
            tracing::debug!("Preflight without Origin header");
            return out;
        };
        if !self.policy.allowed_origins.is_allowed(origin) {
            tracing::debug!(origin, "Preflight from disallowed origin");
            return out;
        }

        let Some(method) = request.method.as_deref() else {
            tracing::debug!(origin, "Preflight without requested method");
            return out;
        };
        if !self.policy.allows_method(method) {
            tracing::debug!(origin, method, "Preflight for disallowed method");
            return out;
        }

        if let Some(denied) = request.headers.iter().find(|h| !self.policy.allows_header(h)) {
            tracing::debug!(origin, header = %denied, "Preflight for disallowed header");
            return out;
        }

        self.push_origin(&mut out, origin);
        out.push(ACCESS_CONTROL_ALLOW_METHODS, &self.policy.allowed_methods.join(", "));

        let allowed_headers = if request.headers.is_empty() {
            self.policy.allowed_headers.join(", ")
        } else {
            request.headers.join(", ")
        };
        if !allowed_headers.is_empty() {
            out.push(ACCESS_CONTROL_ALLOW_HEADERS, &allowed_headers);
        }

        if self.policy.allow_credentials {
            out.push(ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
        }
        if let Some(max_age) = self.policy.max_age {
            out.push(ACCESS_CONTROL_MAX_AGE, &max_age.to_string());
        }

        out
    }

    /// Headers attached to a normal (non-preflight) response.
    pub fn actual_request_headers(&self, origin: Option<&str>) -> CorsHeaders {
        let mut out = CorsHeaders::default();

        match origin {
            _ if self.policy.allowed_origins.is_wildcard() => {
                out.push(ACCESS_CONTROL_ALLOW_ORIGIN, "*");
            }
            Some(origin) if self.policy.allowed_origins.is_allowed(origin) => {
                self.push_origin(&mut out, origin);
            }
            _ => return out,
        }

        if !self.policy.expose_headers.is_empty() {
            out.push(ACCESS_CONTROL_EXPOSE_HEADERS, &self.policy.expose_headers.join(", "));
        }
        if self.policy.allow_credentials {
            out.push(ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
        }

        out
    }

    fn push_origin(&self, out: &mut CorsHeaders, origin: &str) {
        if self.policy.allowed_origins.is_wildcard() {
            out.push(ACCESS_CONTROL_ALLOW_ORIGIN, "*");
        } else {
            out.push(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            out.push(VARY, "Origin");
        }
    }
}
