use thiserror::Error;

use super::tags::TagSyntaxError;

/// Failures while building the metadata of one declaration.
///
/// Every variant is scoped to the declaration being built: a failed build is
/// never cached, and other declarations keep resolving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The documentation text contains a malformed tag.
    #[error("malformed metadata on {declaration}: {source}")]
    Syntax {
        declaration: String,
        #[source]
        source: TagSyntaxError,
    },
    /// A short name matches more than one registered metadata type.
    #[error("cannot resolve metadata name `{name}`: ambiguous between {}", .candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
    /// The metadata type restricts where it may be placed.
    #[error("metadata @{metadata} is not allowed on {target}")]
    PlacementViolation { metadata: String, target: String },
    /// The metadata type may not appear inside another tag.
    #[error("metadata @{metadata} cannot be nested")]
    NestingNotAllowed { metadata: String },
    /// Construction re-entered a metadata type or declaration already being built.
    #[error("circular metadata reference through {name}")]
    CircularReference { name: String },
    /// A documentation source could not be scanned.
    #[error("malformed source `{unit}` at line {line}: {reason}")]
    MalformedSource {
        unit: String,
        line: usize,
        reason: String,
    },
}

/// Failures while editing the alias table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    #[error("alias `{alias}` is reserved and cannot be remapped")]
    Reserved { alias: String },
    #[error("alias and metadata type name must not be empty")]
    Empty,
}
