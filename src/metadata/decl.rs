use std::fmt;

/// Kind of declaration a piece of metadata is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Type,
    Method,
    Property,
}

impl DeclarationKind {
    /// Placement name used by `@Target` values.
    #[must_use]
    pub fn target_name(self) -> &'static str {
        match self {
            DeclarationKind::Type => "class",
            DeclarationKind::Method => "method",
            DeclarationKind::Property => "property",
        }
    }
}

/// Stable identity of a declaration: the cache key for documentation text and
/// built metadata collections.
///
/// Displayed as `Owner`, `Owner::method` or `Owner::$property`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclarationId {
    Type { name: String },
    Method { owner: String, name: String },
    Property { owner: String, name: String },
}

impl DeclarationId {
    pub fn of_type(name: impl Into<String>) -> Self {
        DeclarationId::Type { name: name.into() }
    }

    pub fn method(owner: impl Into<String>, name: impl Into<String>) -> Self {
        DeclarationId::Method {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn property(owner: impl Into<String>, name: impl Into<String>) -> Self {
        DeclarationId::Property {
            owner: owner.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> DeclarationKind {
        match self {
            DeclarationId::Type { .. } => DeclarationKind::Type,
            DeclarationId::Method { .. } => DeclarationKind::Method,
            DeclarationId::Property { .. } => DeclarationKind::Property,
        }
    }

    /// The declaring type: the type itself for a type declaration.
    #[must_use]
    pub fn owner(&self) -> &str {
        match self {
            DeclarationId::Type { name } => name,
            DeclarationId::Method { owner, .. } | DeclarationId::Property { owner, .. } => owner,
        }
    }

    /// Member name, absent for a type declaration.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        match self {
            DeclarationId::Type { .. } => None,
            DeclarationId::Method { name, .. } | DeclarationId::Property { name, .. } => {
                Some(name)
            }
        }
    }
}

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationId::Type { name } => write!(f, "{name}"),
            DeclarationId::Method { owner, name } => write!(f, "{owner}::{name}"),
            DeclarationId::Property { owner, name } => write!(f, "{owner}::${name}"),
        }
    }
}
