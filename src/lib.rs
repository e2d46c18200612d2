//! # tagroute
//!
//! **tagroute** is a REST request dispatcher. Requests are routed to methods
//! of plain service types; which HTTP verb a method serves is declared with
//! lightweight tags in its documentation (`@Get`, `@Post`, ...) rather than
//! in a routing DSL.
//!
//! ## Overview
//!
//! ```rust,ignore
//! impl Users {
//!     /// Fetch one user.
//!     ///
//!     /// @Get
//!     fn fetch(&mut self, req: &HandlerRequest) -> HandlerResult { ... }
//!
//!     /// @Post
//!     /// @Put
//!     fn store(&mut self, req: &HandlerRequest) -> HandlerResult { ... }
//! }
//! ```
//!
//! ```yaml
//! services:
//!   - service: Api_Users
//!     uri: /users/{$id[int]}
//! ```
//!
//! `GET /users/42` runs `fetch` with `id = "42"`; `DELETE /users/42` is
//! answered with 405; `OPTIONS /users/42` lists `get`, `post` and `put`.
//!
//! ## Architecture
//!
//! - **[`router`]** - URI template compiler and first-match-wins route table
//! - **[`metadata`]** - doc tag grammar, documentation sources, name
//!   resolution and the cached metadata builder
//! - **[`service`]** - service declarations and the handler parameter bag
//! - **[`dispatcher`]** - the per-request state machine: routing,
//!   negotiation, verb selection, binding, invocation, error mapping
//! - **[`codec`]** - JSON and XML bodies
//! - **[`server`]** - request/response values and a blocking HTTP adapter
//! - **[`config`]** / **[`runtime_config`]** - configuration file and
//!   process environment
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`app`]** / **[`cli`]** - bootstrap and command line
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as HttpServer<br/>(tiny_http)
//!     participant Dispatcher
//!     participant Routes as RouteTable
//!     participant Meta as MetadataBuilder
//!     participant Service
//!
//!     Client->>Server: GET /user/42/posts
//!     Server->>Dispatcher: dispatch(Request)
//!     Dispatcher->>Routes: match_path("/user/42/posts")
//!     Routes-->>Dispatcher: RouteMatch {id: "42"}
//!     Dispatcher->>Dispatcher: negotiate Content-Type / Accept
//!     Dispatcher->>Meta: build(Service::method) for each method
//!     Meta-->>Dispatcher: MetadataCollection (cached)
//!     Dispatcher->>Service: call(HandlerRequest)
//!     Service-->>Dispatcher: Payload
//!     Dispatcher-->>Server: Response 200 (xml or json)
//!     Server-->>Client: HTTP response
//! ```
//!
//! ## Concurrency
//!
//! Requests are handled independently on the server's worker threads. The
//! route table, metadata registry and metadata caches are shared read-mostly
//! state; each declaration's metadata is built at most once.
//!
//! ## Error Handling
//!
//! Library errors are `thiserror` enums ([`router::CompileError`],
//! [`metadata::MetadataError`], [`codec::CodecError`],
//! [`config::ConfigError`], [`dispatcher::HttpError`],
//! [`service::ServiceError`]); bootstrap code uses `anyhow`.

pub mod app;
pub mod cli;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod ids;
pub mod logging;
pub mod metadata;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod service;

pub use app::{Application, ApplicationBuilder};
pub use dispatcher::{Dispatcher, HttpError};
pub use ids::RequestId;
pub use server::{Request, Response};
pub use service::{HandlerRequest, HandlerResult, Payload, ServiceBuilder, ServiceError};
