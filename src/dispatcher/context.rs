use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::codec::ContentKind;
use crate::ids::RequestId;
use crate::router::RouteMatch;
use crate::service::{MethodDef, ServiceDef};

use super::negotiate::ResponseFormat;

/// Steps of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    ReceiveRequest,
    MatchRoute,
    Negotiate,
    MatchVerbHandler,
    BuildOptionsResponse,
    BindParameters,
    Invoke,
    FormatResponse,
    Send,
    HandleError,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything known about one in-flight request.
///
/// Owned by a single dispatch and dropped when the response is produced.
#[derive(Debug)]
pub struct DispatchContext {
    pub request_id: RequestId,
    pub state: DispatchState,
    /// Sanitized verb, e.g. `Post`
    pub method: Option<String>,
    pub request_kind: Option<ContentKind>,
    pub response_format: Option<ResponseFormat>,
    pub route: Option<RouteMatch>,
    pub service: Option<Arc<ServiceDef>>,
    pub handler: Option<Arc<MethodDef>>,
    /// Decoded body for `Post` and `Put`, an empty map otherwise
    pub body: Value,
}

impl DispatchContext {
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            state: DispatchState::ReceiveRequest,
            method: None,
            request_kind: None,
            response_format: None,
            route: None,
            service: None,
            handler: None,
            body: Value::Object(Map::new()),
        }
    }

    pub fn advance(&mut self, next: DispatchState) {
        debug!(from = %self.state, to = %next, "Dispatch state");
        self.state = next;
    }

    /// Negotiated response format, XML before negotiation completes.
    #[must_use]
    pub fn format(&self) -> ResponseFormat {
        self.response_format
            .clone()
            .unwrap_or_else(ResponseFormat::fallback)
    }
}
