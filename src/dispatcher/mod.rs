//! # Dispatcher Module
//!
//! The dispatcher turns one [`Request`](crate::server::Request) into one
//! [`Response`](crate::server::Response). It is a small sequential state
//! machine; the shared state it reads (route table, service registry,
//! metadata caches) is built once at startup.
//!
//! ## Request Flow
//!
//! 1. **MatchRoute**: an empty path or `/` is 400. The path is
//!    percent-decoded (undecodable paths are 500) and matched against the
//!    route table, first match wins. No match is 400.
//! 2. **Negotiate**: the verb is capitalized (`POST` becomes `Post`). The
//!    request kind comes from `Content-Type` (absent means XML), the response
//!    kind from `Accept` (absent means the request kind). Unrecognised media
//!    types are 415.
//! 3. **MatchVerbHandler**: the first method of the routed service whose
//!    metadata carries the verb tag (`@Get`, `@Post`, ...) is selected. None
//!    is 405. `OPTIONS` instead lists the verbs tagged on any method.
//! 4. **BindParameters**: path variables, query parameters and, for `Post`
//!    and `Put` only, the decoded body (undecodable bodies are 400).
//! 5. **Invoke** and **FormatResponse**: the result is encoded with status
//!    200; an empty result is an empty body.
//!
//! ## Error Handling
//!
//! - [`HttpError`] carries its own status and message
//! - any other failure, including malformed metadata, is 500 with
//!   `{"error": message}`
//! - [`ServiceError::Fatal`](crate::service::ServiceError::Fatal) aborts the
//!   request with a [`FatalError`] and no response
//!
//! Every dispatch runs inside a `dispatch` tracing span carrying the request
//! id, which is also returned in the `X-Request-Id` header.

mod context;
mod core;
mod error;
mod negotiate;
mod verbs;

pub use context::{DispatchContext, DispatchState};
pub use core::{Dispatcher, DispatcherSettings};
pub use error::{ErrorMessage, FatalError, HttpError};
pub use negotiate::{request_kind, response_format, sanitize_method, ResponseFormat};
pub use verbs::{dispatch_verb_type, register_verbs, OPTION_VERBS, VERB_TYPES};
