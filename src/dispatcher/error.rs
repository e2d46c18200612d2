use http::StatusCode;
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

use crate::ids::RequestId;

/// Message carried by an [`HttpError`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ErrorMessage {
    #[default]
    None,
    /// Wrapped as `{"error": text}` on the wire
    Text(String),
    /// Encoded as-is
    Data(Map<String, Value>),
}

impl From<&str> for ErrorMessage {
    fn from(text: &str) -> Self {
        ErrorMessage::Text(text.to_string())
    }
}

impl From<String> for ErrorMessage {
    fn from(text: String) -> Self {
        ErrorMessage::Text(text)
    }
}

impl From<Map<String, Value>> for ErrorMessage {
    fn from(map: Map<String, Value>) -> Self {
        ErrorMessage::Data(map)
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMessage::None => Ok(()),
            ErrorMessage::Text(text) => f.write_str(text),
            ErrorMessage::Data(map) => write!(f, "{}", Value::Object(map.clone())),
        }
    }
}

/// A failure that maps directly to an HTTP status.
///
/// Only 400–417 and 500–505 are accepted; any other code becomes 500.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} {message}", .status.as_u16())]
pub struct HttpError {
    status: StatusCode,
    message: ErrorMessage,
}

impl HttpError {
    pub fn new(status: u16, message: impl Into<ErrorMessage>) -> Self {
        let status = if is_declared_status(status) {
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<ErrorMessage>) -> Self {
        Self::new(400, message)
    }

    pub fn not_found(message: impl Into<ErrorMessage>) -> Self {
        Self::new(404, message)
    }

    pub fn method_not_allowed(message: impl Into<ErrorMessage>) -> Self {
        Self::new(405, message)
    }

    pub fn unsupported_media_type(message: impl Into<ErrorMessage>) -> Self {
        Self::new(415, message)
    }

    pub fn internal_server_error(message: impl Into<ErrorMessage>) -> Self {
        Self::new(500, message)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &ErrorMessage {
        &self.message
    }

    /// Body to encode for this error.
    #[must_use]
    pub fn payload(&self) -> Value {
        match &self.message {
            ErrorMessage::None => Value::Null,
            ErrorMessage::Text(text) => json!({ "error": text }),
            ErrorMessage::Data(map) => Value::Object(map.clone()),
        }
    }
}

fn is_declared_status(code: u16) -> bool {
    (400..=417).contains(&code) || (500..=505).contains(&code)
}

/// A failure that terminates the request without a response.
#[derive(Debug, Error)]
#[error("request {request_id} aborted: {reason:#}")]
pub struct FatalError {
    pub request_id: RequestId,
    pub reason: anyhow::Error,
}
