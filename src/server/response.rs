use http::StatusCode;
use serde_json::Value;
use std::sync::Arc;

use super::request::HeaderVec;

/// HTTP-shaped response produced by the dispatcher.
///
/// `Content-Type` and `Content-Length` are always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderVec,
    pub body: String,
}

impl Response {
    pub fn new(status: StatusCode, content_type: &str, body: String) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("Content-Type"), content_type.to_string()));
        headers.push((Arc::from("Content-Length"), body.len().to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header. `Content-Length` is derived from the body and
    /// cannot be replaced.
    pub fn set_header(&mut self, name: &str, value: String) {
        if name.eq_ignore_ascii_case("content-length") {
            return;
        }
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }

    /// Body parsed as JSON, `None` when it is not JSON.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}
