use tracing::debug;

use crate::metadata::{AliasError, MetadataRegistry, MetadataType, Placement};

/// Verb tags and the metadata types they resolve to.
pub const VERB_TYPES: [(&str, &str); 5] = [
    ("Get", "Dispatch_Verb_Get"),
    ("Post", "Dispatch_Verb_Post"),
    ("Put", "Dispatch_Verb_Put"),
    ("Delete", "Dispatch_Verb_Delete"),
    ("Options", "Dispatch_Verb_Options"),
];

/// Verbs listed in an OPTIONS response, in this order of precedence.
pub const OPTION_VERBS: [&str; 4] = ["Get", "Post", "Put", "Delete"];

/// Metadata type a request verb dispatches on, for the four routed verbs.
#[must_use]
pub fn dispatch_verb_type(verb: &str) -> Option<&'static str> {
    if !OPTION_VERBS.contains(&verb) {
        return None;
    }
    VERB_TYPES
        .iter()
        .find(|(alias, _)| *alias == verb)
        .map(|(_, canonical)| *canonical)
}

/// Register the verb metadata types, method-only, and their short aliases.
///
/// # Errors
///
/// Fails only if an alias cannot be added.
pub fn register_verbs(registry: &MetadataRegistry) -> Result<(), AliasError> {
    for (alias, canonical) in VERB_TYPES {
        registry.register(MetadataType::new(canonical).restricted_to(&[Placement::Method]));
        registry.add_alias(alias, canonical)?;
        debug!(alias = %alias, metadata_type = %canonical, "Verb metadata registered");
    }
    Ok(())
}
