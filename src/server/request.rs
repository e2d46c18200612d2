use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

use crate::router::ParamVec;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage: names are `Arc<str>`, values are per-request strings.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// HTTP-shaped request handed to the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Verb as received, e.g. `GET`
    pub method: String,
    /// Raw (still percent-encoded) path without the query string
    pub path: String,
    pub query: ParamVec,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl Request {
    /// Build a request from a verb and a request target such as
    /// `/users/7?expand=posts`.
    pub fn new(method: impl Into<String>, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method: method.into(),
            path: path.to_string(),
            query: parse_query(query),
            ..Self::default()
        }
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Get a header by name (case-insensitive, first occurrence).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert headers to a map with lower-case names.
    /// Note: This allocates
    #[must_use]
    pub fn headers_map(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect()
    }
}

/// Split a request target into path and query string.
#[must_use]
pub fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

/// Parse an `application/x-www-form-urlencoded` query string.
#[must_use]
pub fn parse_query(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}
