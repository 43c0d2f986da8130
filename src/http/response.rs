//! Reply encoding.
//!
//! # Responsibilities
//! - Turn a handler's loosely-typed output map into a typed [`Reply`]
//! - Pick status, content type and body bytes for the wire
//!
//! # Design Decisions
//! - `code` 0 means "unset": 200 when data is present or absent
//! - String data is written verbatim; it is labelled JSON only if it parses as JSON
//! - Serialization failures are logged at debug and produce an empty body

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::de::IgnoredAny;
use serde_json::Value;
use thiserror::Error;

use crate::handler::HandlerOutput;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

/// A handler output that cannot be mapped to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    #[error("invalid response code {0}: must be between 100 and 999")]
    InvalidCode(String),
}

/// Reply payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Text(String),
    Json(Value),
}

/// Typed handler reply. `code` 0 means no explicit status.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reply {
    pub code: u16,
    pub data: Option<ResponseBody>,
}

/// Everything that goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedReply {
    pub status: StatusCode,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn new(code: u16, data: Option<ResponseBody>) -> Self {
        Self { code, data }
    }

    pub fn text(code: u16, text: impl Into<String>) -> Self {
        Self::new(code, Some(ResponseBody::Text(text.into())))
    }

    pub fn json(code: u16, value: Value) -> Self {
        Self::new(code, Some(ResponseBody::Json(value)))
    }

    /// Map a handler's output. Reads the `code` and `data` keys; other
    /// keys are ignored.
    pub fn from_map(mut map: HandlerOutput) -> Result<Self, ReplyError> {
        let code = match map.get("code") {
            None | Some(Value::Null) => 0,
            Some(value) => parse_code(value)?,
        };

        let data = match map.remove("data") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(ResponseBody::Text(s)),
            Some(other) => Some(ResponseBody::Json(other)),
        };

        Ok(Self { code, data })
    }

    /// Resolve status, content type and body.
    pub fn encode(self) -> EncodedReply {
        let status = |code: u16| {
            if code == 0 {
                StatusCode::OK
            } else {
                StatusCode::from_u16(code).unwrap_or(StatusCode::OK)
            }
        };

        match self.data {
            None => EncodedReply {
                status: status(self.code),
                content_type: None,
                body: Vec::new(),
            },
            Some(ResponseBody::Text(text)) => {
                let content_type = if serde_json::from_str::<IgnoredAny>(&text).is_ok() {
                    JSON_CONTENT_TYPE
                } else {
                    TEXT_CONTENT_TYPE
                };
                EncodedReply {
                    status: status(self.code),
                    content_type: Some(content_type),
                    body: text.into_bytes(),
                }
            }
            Some(ResponseBody::Json(value)) => {
                let body = serde_json::to_vec(&value).unwrap_or_else(|e| {
                    tracing::debug!(error = %e, "Failed to serialize reply body");
                    Vec::new()
                });
                EncodedReply {
                    status: status(self.code),
                    content_type: Some(JSON_CONTENT_TYPE),
                    body,
                }
            }
        }
    }
}

fn parse_code(value: &Value) -> Result<u16, ReplyError> {
    let invalid = || ReplyError::InvalidCode(value.to_string());

    let number = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(invalid)?;

    match number {
        0 => Ok(0),
        100..=999 => Ok(number as u16),
        _ => Err(invalid()),
    }
}

impl IntoResponse for EncodedReply {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        if let Some(content_type) = self.content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        response
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        self.encode().into_response()
    }
}

/// 400 reply carrying an error's text.
pub fn bad_request(message: impl Into<String>) -> Response {
    Reply::text(StatusCode::BAD_REQUEST.as_u16(), message).into_response()
}
