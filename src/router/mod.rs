//! # Router Module
//!
//! The router turns URI templates into compiled routes and matches incoming
//! request paths against them.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Validating URI templates such as `/user/{$id[int]}/posts`
//! - Reducing each variable's declared types to the smallest equivalent set
//! - Building an anchored match pattern (no capture groups) and an extract
//!   pattern (one capture group per variable) for every route
//! - Matching request paths in declaration order, first match wins
//!
//! ## Template grammar
//!
//! A template is a sequence of segments, each starting with `/`:
//!
//! - literal: `/[A-Za-z0-9_]*[A-Za-z0-9]_*` (not empty, not only underscores)
//! - variable: `/{$name}` or `/{$name[type|type...]}` where `type` is one of
//!   `int`, `float`, `string`, `alpha`, `alphanum`
//!
//! A variable without a type list accepts `string`. Type lists are reduced:
//! `string` absorbs every other type, `float` absorbs `int` and `alphanum`
//! absorbs `alpha`.
//!
//! ## Example
//!
//! ```rust
//! use tagroute::router::RouteTable;
//!
//! let table = RouteTable::from_mappings([
//!     ("User_Posts", "/user/{$id[int]}/posts"),
//! ]).unwrap();
//!
//! let m = table.match_path("/user/42/posts").unwrap();
//! assert_eq!(m.route.service(), "User_Posts");
//! assert_eq!(m.get_path_param("id"), Some("42"));
//! ```
//!
//! ## Duplicate variable names
//!
//! A template may repeat a variable name. Both values are extracted in order;
//! a lookup by name returns the last one.

mod core;
mod pattern;

pub use core::{
    decode_path, ParamVec, RouteDefinition, RouteError, RouteMatch, RouteTable,
    MAX_INLINE_PARAMS,
};
pub use pattern::{
    compile_template, CompileError, CompiledTemplate, PathVariable, TypeConstraint,
    TypeConstraintSet, REGEX_ALPHA, REGEX_ALPHANUM, REGEX_FLOAT, REGEX_INT, REGEX_STRING,
};
