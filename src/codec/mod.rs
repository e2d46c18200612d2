//! # Codec Module
//!
//! Wire formats for request and response bodies. Two content kinds are
//! supported, JSON and XML, each selected from a fixed list of media types:
//!
//! | Kind | Media types |
//! | --- | --- |
//! | XML | `application/xml`, `text/xml` |
//! | JSON | `text/x-json`, `text/json`, `application/json` |
//!
//! Classification is case-insensitive and ignores any `;` parameter suffix
//! (`application/json; charset=utf-8` is JSON).
//!
//! Bodies travel as [`serde_json::Value`]: decoding always yields a map (or a
//! list for JSON arrays) and encoding accepts a map, bare text, or `null`.

mod json;
mod xml;

use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub const XML_MEDIA_TYPES: [&str; 2] = ["application/xml", "text/xml"];
pub const JSON_MEDIA_TYPES: [&str; 3] = ["text/x-json", "text/json", "application/json"];

/// Wire format of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Json,
    Xml,
}

impl ContentKind {
    /// `Content-Type` used when the client did not name one.
    #[must_use]
    pub fn default_media_type(self) -> &'static str {
        match self {
            ContentKind::Json => "text/json",
            ContentKind::Xml => "text/xml",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentKind::Json => "json",
            ContentKind::Xml => "xml",
        })
    }
}

/// Lower-cased media type without parameters.
#[must_use]
pub fn essence(header_value: &str) -> String {
    header_value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Content kind of a media type, `None` when it is not recognized.
#[must_use]
pub fn classify(media_type: &str) -> Option<ContentKind> {
    let essence = essence(media_type);
    if XML_MEDIA_TYPES.contains(&essence.as_str()) {
        Some(ContentKind::Xml)
    } else if JSON_MEDIA_TYPES.contains(&essence.as_str()) {
        Some(ContentKind::Json)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("cannot decode {kind} body: {reason}")]
    Decode { kind: ContentKind, reason: String },
    #[error("cannot encode {kind} body: {reason}")]
    Encode { kind: ContentKind, reason: String },
}

/// Encoding switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Indent XML output
    pub pretty_xml: bool,
}

/// Encode `value` as `kind`.
///
/// `value` must be a map, a string or `null`; lists, numbers and booleans are
/// only accepted inside a map.
///
/// # Errors
///
/// [`CodecError::Encode`] for any other top-level shape or a writer failure.
pub fn encode(value: &Value, kind: ContentKind, options: EncodeOptions) -> Result<String, CodecError> {
    if !matches!(value, Value::Object(_) | Value::String(_) | Value::Null) {
        return Err(CodecError::Encode {
            kind,
            reason: "top-level value must be a map or text".to_string(),
        });
    }
    match kind {
        ContentKind::Json => json::encode(value),
        ContentKind::Xml => xml::encode(value, options.pretty_xml),
    }
}

/// Decode a request body.
///
/// # Errors
///
/// [`CodecError::Decode`] when the body is not a well-formed document of the
/// expected kind.
pub fn decode(body: &[u8], kind: ContentKind) -> Result<Value, CodecError> {
    match kind {
        ContentKind::Json => json::decode(body),
        ContentKind::Xml => xml::decode(body),
    }
}
