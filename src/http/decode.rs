//! Request body decoding.
//!
//! # Responsibilities
//! - Buffer the request body up to the configured limit; multipart bodies
//!   are streamed instead
//! - Classify the body by its declared Content-Type, never by sniffing
//! - Produce exactly one [`ContentValue`] or a [`DecodeError`]
//!
//! | Content-Type                          | Result                          |
//! |---------------------------------------|---------------------------------|
//! | `application/x-www-form-urlencoded`   | `Form`, first value per key     |
//! | `application/json`                    | `Json`, or `Empty` for no body  |
//! | `multipart/form-data; boundary=...`   | `Multipart` with file parts     |
//! | anything else, or absent              | `Raw` string                    |
//!
//! The first two are exact, case-sensitive matches; multipart is a prefix match.

use std::collections::HashMap;

use axum::body::{Body, Bytes};
use futures_util::stream;
use serde_json::Value;
use thiserror::Error;

use crate::config::ListenerConfig;
use crate::http::multipart;
use crate::http::request::ContentValue;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Why a body could not be decoded. Always surfaces as a 400.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error("invalid form body: {0}")]
    Form(String),

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("failed to buffer multipart upload: {0}")]
    Spill(#[from] std::io::Error),
}

impl DecodeError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::Body(_) => "body",
            DecodeError::Form(_) => "form",
            DecodeError::Json(_) => "json",
            DecodeError::Multipart(_) => "multipart",
            DecodeError::Spill(_) => "spill",
        }
    }
}

/// Body classes, decided from the Content-Type header alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Form,
    Json,
    Multipart,
    Raw,
}

impl ContentKind {
    pub fn classify(content_type: Option<&str>) -> Self {
        match content_type {
            Some(FORM_CONTENT_TYPE) => ContentKind::Form,
            Some(JSON_CONTENT_TYPE) => ContentKind::Json,
            Some(ct) if ct.starts_with(MULTIPART_CONTENT_TYPE) => ContentKind::Multipart,
            _ => ContentKind::Raw,
        }
    }
}

/// Per-request buffering limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_body_bytes: usize,
    pub multipart_memory_bytes: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::from(&ListenerConfig::default())
    }
}

impl From<&ListenerConfig> for DecodeLimits {
    fn from(config: &ListenerConfig) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes,
            multipart_memory_bytes: config.multipart_memory_bytes,
        }
    }
}

/// Buffer a request body, failing once it exceeds `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, DecodeError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(DecodeError::Body)
}

/// Decode a request body according to its declared content type.
///
/// Multipart bodies are parsed straight off the wire so the memory budget
/// holds; every other class is buffered first.
pub async fn decode_body(
    content_type: Option<&str>,
    body: Body,
    limits: &DecodeLimits,
) -> Result<ContentValue, DecodeError> {
    if let (ContentKind::Multipart, Some(content_type)) = (ContentKind::classify(content_type), content_type) {
        let files = multipart::decode_files(content_type, body.into_data_stream(), limits).await?;
        return Ok(ContentValue::Multipart { files });
    }

    let bytes = read_body(body, limits.max_body_bytes).await?;
    decode(content_type, bytes, limits).await
}

/// Decode a buffered body according to its declared content type.
pub async fn decode(
    content_type: Option<&str>,
    body: Bytes,
    limits: &DecodeLimits,
) -> Result<ContentValue, DecodeError> {
    match ContentKind::classify(content_type) {
        ContentKind::Form => decode_form(&body).map(ContentValue::Form),
        ContentKind::Json => decode_json(&body),
        ContentKind::Multipart => {
            // classify() only returns Multipart for Some(_)
            let content_type = content_type.unwrap_or(MULTIPART_CONTENT_TYPE);
            let body = stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
            let files = multipart::decode_files(content_type, body, limits).await?;
            Ok(ContentValue::Multipart { files })
        }
        ContentKind::Raw => Ok(ContentValue::Raw(String::from_utf8_lossy(&body).into_owned())),
    }
}

/// Parse a URL-encoded form, keeping the first value of each key.
pub fn decode_form(body: &[u8]) -> Result<HashMap<String, String>, DecodeError> {
    let text = String::from_utf8_lossy(body);
    check_form_encoding(&text)?;

    let mut form = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(text.as_bytes()) {
        form.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    Ok(form)
}

/// Reject `;` separators and malformed `%` escapes, which the lenient
/// parser would otherwise pass through silently.
fn check_form_encoding(text: &str) -> Result<(), DecodeError> {
    for pair in text.split('&') {
        if pair.contains(';') {
            return Err(DecodeError::Form("invalid semicolon separator".to_string()));
        }

        let mut rest = pair.as_bytes();
        while let Some(pos) = rest.iter().position(|&b| b == b'%') {
            match rest.get(pos + 1..pos + 3) {
                Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => rest = &rest[pos + 3..],
                _ => {
                    let end = (pos + 3).min(rest.len());
                    let escape = String::from_utf8_lossy(&rest[pos..end]);
                    return Err(DecodeError::Form(format!("invalid URL escape {:?}", escape)));
                }
            }
        }
    }
    Ok(())
}

/// Decode the first JSON value in the body. An empty body is `Empty`.
pub fn decode_json(body: &[u8]) -> Result<ContentValue, DecodeError> {
    let mut values = serde_json::Deserializer::from_slice(body).into_iter::<Value>();
    match values.next() {
        None => Ok(ContentValue::Empty),
        Some(Ok(value)) => Ok(ContentValue::Json(value)),
        Some(Err(e)) => Err(DecodeError::Json(e)),
    }
}
