//! # Service Module
//!
//! Services are the handler types routes point at. A service is a plain Rust
//! type plus an ordered list of methods; which HTTP verb each method serves is
//! declared in its documentation with tags such as `@Get` or `@Post`, read by
//! the [`metadata`](crate::metadata) module.
//!
//! ## Declaring a service
//!
//! ```rust
//! use tagroute::service::{HandlerRequest, HandlerResult, Payload, ServiceBuilder};
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct Users;
//!
//! impl Users {
//!     fn fetch(&mut self, req: &HandlerRequest) -> HandlerResult {
//!         let id = req.get_path_param("id").unwrap_or_default();
//!         Payload::try_from(json!({ "user": { "id": id } }))
//!     }
//! }
//!
//! let users = ServiceBuilder::<Users>::with_default("Api_Users")
//!     .method_with_doc("fetch", "@Get", Users::fetch)
//!     .build();
//! assert_eq!(users.methods().len(), 1);
//! ```
//!
//! Methods are tried in the order they are declared. Every invocation runs on
//! a fresh instance built by the service's factory.
//!
//! ## Results
//!
//! A method returns [`Payload::Empty`], [`Payload::Text`] or
//! [`Payload::Data`], or fails with a [`ServiceError`]:
//!
//! - `Status`: an [`HttpError`](crate::dispatcher::HttpError) mapped to its
//!   status and encoded message
//! - `Failure`: anything else, answered with 500
//! - `Fatal`: aborts the request without a response

mod core;

pub use core::{
    HandlerRequest, HandlerResult, MethodDef, MethodFn, Payload, ServiceBuilder, ServiceDef,
    ServiceError, ServiceRegistry,
};
