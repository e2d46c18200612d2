use crate::codec::{classify, essence, ContentKind};

use super::error::HttpError;

/// Verb in capitalized form: `POST` becomes `Post`.
#[must_use]
pub fn sanitize_method(method: &str) -> String {
    let lower = method.trim().to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Content kind of the request body.
///
/// A missing or blank `Content-Type` means XML.
///
/// # Errors
///
/// 415 when the header names a type that is neither XML nor JSON.
pub fn request_kind(content_type: Option<&str>) -> Result<ContentKind, HttpError> {
    let Some(header) = content_type.filter(|v| !v.trim().is_empty()) else {
        return Ok(ContentKind::Xml);
    };
    classify(header).ok_or_else(|| {
        HttpError::unsupported_media_type(format!("Content-Type \"{header}\" is not supported"))
    })
}

/// Negotiated response format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFormat {
    pub kind: ContentKind,
    /// Media type picked from the client's `Accept` header, echoed back
    pub accepted: Option<String>,
}

impl ResponseFormat {
    /// Format used before negotiation completes.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            kind: ContentKind::Xml,
            accepted: None,
        }
    }

    /// `Content-Type` header value for the response.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.accepted
            .as_deref()
            .unwrap_or_else(|| self.kind.default_media_type())
    }
}

/// Response format from the `Accept` header.
///
/// The header is split on `,` and the first recognised media range wins.
/// `*/*` and blank ranges count as no preference; with no preference the
/// response uses the request's kind.
///
/// # Errors
///
/// 415 when the header states preferences and none of them is recognised.
pub fn response_format(
    accept: Option<&str>,
    request: ContentKind,
) -> Result<ResponseFormat, HttpError> {
    let mut stated = false;
    for range in accept.unwrap_or_default().split(',') {
        let media = essence(range);
        if media.is_empty() || media == "*/*" {
            continue;
        }
        stated = true;
        if let Some(kind) = classify(&media) {
            return Ok(ResponseFormat {
                kind,
                accepted: Some(media),
            });
        }
    }
    if stated {
        let header = accept.unwrap_or_default();
        return Err(HttpError::unsupported_media_type(format!(
            "Accept header \"{header}\" is not supported"
        )));
    }
    Ok(ResponseFormat {
        kind: request,
        accepted: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_are_capitalized() {
        assert_eq!(sanitize_method("POST"), "Post");
        assert_eq!(sanitize_method("get"), "Get");
        assert_eq!(sanitize_method("oPTIONS"), "Options");
        assert_eq!(sanitize_method(""), "");
    }

    #[test]
    fn request_kind_defaults_to_xml() {
        assert_eq!(request_kind(None).unwrap(), ContentKind::Xml);
        assert_eq!(request_kind(Some("  ")).unwrap(), ContentKind::Xml);
        assert_eq!(
            request_kind(Some("Application/JSON; charset=utf-8")).unwrap(),
            ContentKind::Json
        );
        let err = request_kind(Some("text/plain")).unwrap_err();
        assert_eq!(err.status().as_u16(), 415);
    }

    #[test]
    fn accept_falls_back_to_request_kind() {
        let format = response_format(None, ContentKind::Json).unwrap();
        assert_eq!(format.kind, ContentKind::Json);
        assert_eq!(format.content_type(), "text/json");

        let format = response_format(Some("*/*"), ContentKind::Xml).unwrap();
        assert_eq!(format.content_type(), "text/xml");
    }

    #[test]
    fn accept_list_picks_first_recognised() {
        let format =
            response_format(Some("text/html, application/json;q=0.9, text/xml"), ContentKind::Xml)
                .unwrap();
        assert_eq!(format.kind, ContentKind::Json);
        assert_eq!(format.content_type(), "application/json");
    }

    #[test]
    fn unrecognised_accept_is_415() {
        let err = response_format(Some("text/html"), ContentKind::Json).unwrap_err();
        assert_eq!(err.status().as_u16(), 415);
    }
}
