//! # Metadata Module
//!
//! Declarative metadata read from documentation text. Service methods declare
//! the HTTP verbs they serve with tags such as `@Get` or `@Post` in their doc
//! comments; this module finds those tags, resolves them to registered
//! metadata types and realizes them as typed instances.
//!
//! ## Pipeline
//!
//! 1. **Documentation sources** ([`DocSource`]): documentation text per
//!    [`DeclarationId`], either registered explicitly ([`NativeDocs`]) or
//!    scanned from Rust source text ([`SourceDocs`]). Both can be stacked with
//!    [`LayeredDocs`].
//! 2. **Parser cache** ([`DocCommentCache`]): memoizes the text per
//!    declaration so each source location is read once.
//! 3. **Tag grammar** ([`parse_tags`]): `@Name`, `@Name("value")`,
//!    `@Name(key = 1, list = {"a", "b"}, nested = @Other)`.
//! 4. **Name resolution** ([`MetadataRegistry::resolve`]): alias table first,
//!    then registered types named exactly like the tag or ending in
//!    `_ShortName`. More than one candidate is an ambiguity error.
//! 5. **Construction** ([`MetadataBuilder::build`]): unknown parameters are
//!    dropped with a warning, `@Target` placement restrictions are enforced,
//!    circular construction is rejected. Results are grouped per type into a
//!    [`MetadataCollection`] and cached per declaration.
//!
//! ## Placement restrictions
//!
//! A metadata type restricts where it may appear through its own
//! documentation:
//!
//! ```rust
//! use tagroute::metadata::{MetadataRegistry, MetadataType, Placement};
//!
//! let registry = MetadataRegistry::new();
//! registry.register(MetadataType::new("Http_Get").restricted_to(&[Placement::Method]));
//! ```
//!
//! Valid placements are `class`, `method`, `property` and `nested`.
//!
//! ## Concurrency
//!
//! The registry, the parser cache and the builder cache are shared by every
//! request. Each declaration is built at most once; concurrent first requests
//! wait for that build and receive the same `Arc<MetadataCollection>`. Failed
//! builds are not cached. `clear()` on each cache resets it for tests.

mod builder;
mod collection;
mod decl;
mod error;
mod parser;
mod registry;
mod scanner;
mod source;
mod tags;

pub use builder::MetadataBuilder;
pub use collection::{InstanceTarget, MetadataCollection, MetadataInstance, MetadataValue};
pub use decl::{DeclarationId, DeclarationKind};
pub use error::{AliasError, MetadataError};
pub use parser::DocCommentCache;
pub use registry::{AliasTable, MetadataRegistry, MetadataType, Placement, TARGET_ALIAS, TARGET_TYPE};
pub use source::{DocSource, LayeredDocs, NativeDocs, SourceDocs};
pub use tags::{parse_tags, RawTag, TagSyntaxError, TagValue, VALUE_FIELD};
