//! # Server Module
//!
//! HTTP-shaped request and response values consumed and produced by the
//! [`Dispatcher`](crate::dispatcher::Dispatcher), plus a blocking
//! `tiny_http` adapter serving a dispatcher over TCP.

pub mod http_server;
pub mod request;
pub mod response;

pub use http_server::{serve, HttpServer, ServerHandle};
pub use request::{parse_query, split_target, HeaderVec, Request, MAX_INLINE_HEADERS};
pub use response::Response;
