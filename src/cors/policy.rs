//! CORS policy resolved from the environment.
//!
//! Keys live under a fixed prefix (`REST_INGRESS_ALLOW_ORIGIN`, ...). The
//! policy is read once at startup and passed to the negotiator by value.

use thiserror::Error;

/// Environment prefix for every CORS key.
pub const CORS_PREFIX: &str = "REST_INGRESS";

pub const ALLOW_ORIGIN_KEY: &str = "ALLOW_ORIGIN";
pub const ALLOW_METHODS_KEY: &str = "ALLOW_METHODS";
pub const ALLOW_HEADERS_KEY: &str = "ALLOW_HEADERS";
pub const EXPOSE_HEADERS_KEY: &str = "EXPOSE_HEADERS";
pub const ALLOW_CREDENTIALS_KEY: &str = "ALLOW_CREDENTIALS";
pub const MAX_AGE_KEY: &str = "MAX_AGE";

const DEFAULT_ALLOW_ORIGIN: &str = "*";
const DEFAULT_ALLOW_METHODS: &str = "POST, GET, OPTIONS, PUT, DELETE, PATCH";
const DEFAULT_ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept, Authorization";

/// Invalid CORS policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsConfigError {
    #[error("CORS configuration error: cannot use wildcard origin (*) with credentials")]
    WildcardWithCredentials,

    #[error("CORS configuration error: {key} must be true or false, got {value:?}")]
    InvalidBool { key: String, value: String },

    #[error("CORS configuration error: {key} must be a number of seconds, got {value:?}")]
    InvalidMaxAge { key: String, value: String },
}

/// Which origins may make cross-origin requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    fn parse(value: &str) -> Self {
        let origins = split_list(value);
        if origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        match self {
            AllowedOrigins::Any => true,
            AllowedOrigins::List(origins) => origins.iter().any(|o| o == origin),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, AllowedOrigins::Any)
    }
}

/// Immutable cross-origin policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allowed_origins: AllowedOrigins,
    /// Uppercased method names.
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age: Option<u32>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::parse(DEFAULT_ALLOW_ORIGIN),
            allowed_methods: parse_methods(DEFAULT_ALLOW_METHODS),
            allowed_headers: split_list(DEFAULT_ALLOW_HEADERS),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age: None,
        }
    }
}

impl CorsPolicy {
    /// Resolve the policy from process environment variables.
    pub fn from_env(prefix: &str) -> Result<Self, CorsConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Resolve the policy through an arbitrary key lookup.
    ///
    /// Unset or blank keys fall back to the defaults.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, CorsConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            let full = format!("{}_{}", prefix, key);
            let value = lookup(&full).filter(|v| !v.trim().is_empty());
            (full, value)
        };

        let mut policy = Self::default();

        if let (_, Some(v)) = get(ALLOW_ORIGIN_KEY) {
            policy.allowed_origins = AllowedOrigins::parse(&v);
        }
        if let (_, Some(v)) = get(ALLOW_METHODS_KEY) {
            policy.allowed_methods = parse_methods(&v);
        }
        if let (_, Some(v)) = get(ALLOW_HEADERS_KEY) {
            policy.allowed_headers = split_list(&v);
        }
        if let (_, Some(v)) = get(EXPOSE_HEADERS_KEY) {
            policy.expose_headers = split_list(&v);
        }
        if let (key, Some(v)) = get(ALLOW_CREDENTIALS_KEY) {
            policy.allow_credentials = match v.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(CorsConfigError::InvalidBool { key, value: v }),
            };
        }
        if let (key, Some(v)) = get(MAX_AGE_KEY) {
            let secs = v
                .trim()
                .parse()
                .map_err(|_| CorsConfigError::InvalidMaxAge { key, value: v.clone() })?;
            policy.max_age = Some(secs);
        }

        if policy.allow_credentials && policy.allowed_origins.is_wildcard() {
            return Err(CorsConfigError::WildcardWithCredentials);
        }

        Ok(policy)
    }

    pub fn allows_method(&self, method: &str) -> bool {
        self.allowed_methods.iter().any(|m| m.eq_ignore_ascii_case(method.trim()))
    }

    pub fn allows_header(&self, header: &str) -> bool {
        self.allowed_headers.iter().any(|h| h.eq_ignore_ascii_case(header.trim()))
    }
}

/// Split a comma-separated list, dropping blanks.
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_methods(value: &str) -> Vec<String> {
    split_list(value)
        .into_iter()
        .map(|m| m.to_ascii_uppercase())
        .collect()
}
