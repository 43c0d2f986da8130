//! Canonical request representation.
//!
//! # Responsibilities
//! - Define the content-type independent request handed to handlers
//! - Flatten query parameters and headers into single-valued maps
//!
//! # Design Decisions
//! - Multi-valued query parameters and headers are joined with `,`
//! - Header names keep the lowercase form the HTTP layer hands us
//! - Exactly one [`ContentValue`] variant per request, picked by Content-Type

use std::collections::HashMap;

use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;

/// Normalized inbound request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRequest {
    /// Uppercased method the route was registered under.
    pub method: String,
    pub path_params: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    /// Keyed by lowercase header name (`content-type`, not `Content-Type`).
    pub headers: HashMap<String, String>,
    pub content: ContentValue,
}

/// Decoded request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContentValue {
    /// `application/json`
    Json(Value),
    /// `application/x-www-form-urlencoded`, first value per key.
    Form(HashMap<String, String>),
    /// `multipart/form-data`, file parts only.
    Multipart { files: Vec<FileDetail> },
    /// Any other content type.
    Raw(String),
    /// `application/json` with an empty body.
    Empty,
}

/// One uploaded file part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDetail {
    pub field_key: String,
    pub file_name: String,
    /// The part's own Content-Type, empty when it declared none.
    pub file_type: String,
    pub size_bytes: u64,
    #[serde(skip_serializing)]
    pub bytes: Vec<u8>,
}

/// Flatten a raw query string. Repeated keys are joined with `,` in order.
pub fn query_params(query: Option<&str>) -> HashMap<String, String> {
    let mut params: HashMap<String, String> = HashMap::new();
    let Some(query) = query else {
        return params;
    };

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        params
            .entry(key.into_owned())
            .and_modify(|joined| {
                joined.push(',');
                joined.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    params
}

/// Flatten request headers. Repeated headers are joined with `,` in order.
pub fn header_params(headers: &HeaderMap) -> HashMap<String, String> {
    let mut params = HashMap::with_capacity(headers.keys_len());
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        params.insert(name.as_str().to_string(), joined);
    }
    params
}
