use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::decl::{DeclarationId, DeclarationKind};
use super::error::{AliasError, MetadataError};
use super::source::DocSource;
use super::tags::VALUE_FIELD;

/// Canonical name of the built-in placement restriction type.
pub const TARGET_TYPE: &str = "Meta_Target";
/// Reserved alias for [`TARGET_TYPE`].
pub const TARGET_ALIAS: &str = "Target";

/// Placement a metadata type may be restricted to through `@Target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    Class,
    Method,
    Property,
    Nested,
}

impl Placement {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Placement::Class => "class",
            Placement::Method => "method",
            Placement::Property => "property",
            Placement::Nested => "nested",
        }
    }

    #[must_use]
    pub fn of(kind: DeclarationKind) -> Self {
        match kind {
            DeclarationKind::Type => Placement::Class,
            DeclarationKind::Method => Placement::Method,
            DeclarationKind::Property => Placement::Property,
        }
    }
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "class" => Ok(Placement::Class),
            "method" => Ok(Placement::Method),
            "property" => Ok(Placement::Property),
            "nested" => Ok(Placement::Nested),
            other => Err(format!("unknown placement `{other}`")),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metadata type known to the registry.
///
/// Every type has the implicit `value` field. A type's own documentation may
/// carry metadata, notably `@Target(..)` restricting where it can be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataType {
    name: String,
    fields: Vec<String>,
    doc: Option<String>,
}

impl MetadataType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![VALUE_FIELD.to_string()],
            doc: None,
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.fields.contains(&name) {
            self.fields.push(name);
        }
        self
    }

    /// Documentation text of the type itself.
    #[must_use]
    pub fn doc(mut self, text: impl Into<String>) -> Self {
        self.doc = Some(text.into());
        self
    }

    /// Shorthand appending `@Target({..})` to the type's documentation.
    #[must_use]
    pub fn restricted_to(mut self, placements: &[Placement]) -> Self {
        let list: Vec<String> = placements
            .iter()
            .map(|p| format!("\"{}\"", p.as_str()))
            .collect();
        let tag = format!("@{TARGET_ALIAS}({{{}}})", list.join(", "));
        self.doc = Some(match self.doc.take() {
            Some(doc) => format!("{doc}\n{tag}"),
            None => tag,
        });
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    #[must_use]
    pub fn doc_text(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

/// Explicit short-name to canonical-name mappings.
///
/// [`TARGET_ALIAS`] is always mapped to [`TARGET_TYPE`] and cannot be changed.
#[derive(Debug)]
pub struct AliasTable {
    map: RwLock<HashMap<String, String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert(TARGET_ALIAS.to_string(), TARGET_TYPE.to_string());
        Self {
            map: RwLock::new(map),
        }
    }
}

impl AliasTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `alias` to `canonical`, replacing any previous mapping.
    ///
    /// # Errors
    ///
    /// [`AliasError::Reserved`] for the reserved alias, [`AliasError::Empty`]
    /// when either name is empty.
    pub fn add_mapping(&self, alias: &str, canonical: &str) -> Result<(), AliasError> {
        if alias.is_empty() || canonical.is_empty() {
            return Err(AliasError::Empty);
        }
        if alias == TARGET_ALIAS {
            return Err(AliasError::Reserved {
                alias: alias.to_string(),
            });
        }
        self.map
            .write()
            .insert(alias.to_string(), canonical.to_string());
        Ok(())
    }

    #[must_use]
    pub fn mapping(&self, alias: &str) -> Option<String> {
        self.map.read().get(alias).cloned()
    }

    /// The mapped name, or `name` itself when unmapped.
    #[must_use]
    pub fn real_name(&self, name: &str) -> String {
        self.mapping(name).unwrap_or_else(|| name.to_string())
    }

    /// Drop every mapping except the reserved one.
    pub fn clear(&self) {
        let mut map = self.map.write();
        map.clear();
        map.insert(TARGET_ALIAS.to_string(), TARGET_TYPE.to_string());
    }
}

/// Process-wide knowledge about metadata: known types, aliases, the ignore
/// list and the short-name resolution cache.
///
/// Populated at startup and read-mostly afterwards.
#[derive(Debug)]
pub struct MetadataRegistry {
    types: RwLock<Vec<Arc<MetadataType>>>,
    aliases: AliasTable,
    ignored: RwLock<HashSet<String>>,
    resolved: DashMap<String, String>,
}

impl Default for MetadataRegistry {
    fn default() -> Self {
        Self {
            types: RwLock::new(builtin_types()),
            aliases: AliasTable::new(),
            ignored: RwLock::new(HashSet::new()),
            resolved: DashMap::new(),
        }
    }
}

fn builtin_types() -> Vec<Arc<MetadataType>> {
    vec![Arc::new(MetadataType::new(TARGET_TYPE))]
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, replacing one with the same name.
    pub fn register(&self, ty: MetadataType) {
        let mut types = self.types.write();
        debug!(metadata_type = %ty.name(), fields = ?ty.fields(), "Metadata type registered");
        match types.iter_mut().find(|t| t.name() == ty.name()) {
            Some(slot) => *slot = Arc::new(ty),
            None => types.push(Arc::new(ty)),
        }
        self.resolved.clear();
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<MetadataType>> {
        self.types
            .read()
            .iter()
            .find(|t| t.name() == name)
            .map(Arc::clone)
    }

    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        self.types
            .read()
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    #[must_use]
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Add an alias and invalidate cached resolutions.
    ///
    /// # Errors
    ///
    /// See [`AliasTable::add_mapping`].
    pub fn add_alias(&self, alias: &str, canonical: &str) -> Result<(), AliasError> {
        self.aliases.add_mapping(alias, canonical)?;
        self.resolved.clear();
        Ok(())
    }

    /// Skip the named types while building collections.
    pub fn ignore<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored
            .write()
            .extend(names.into_iter().map(Into::into));
    }

    #[must_use]
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.read().contains(name)
    }

    pub fn reset_ignored(&self) {
        self.ignored.write().clear();
    }

    /// Resolve a short tag name to a canonical metadata type name.
    ///
    /// The alias table is consulted first. The result is then matched against
    /// every registered type: a type named exactly like it, or whose name ends
    /// with `_` followed by it, is a candidate. No candidate yields the name
    /// itself, one candidate yields that candidate.
    ///
    /// # Errors
    ///
    /// [`MetadataError::Ambiguous`] when several types are candidates. The
    /// failure is not cached.
    pub fn resolve(&self, short: &str) -> Result<String, MetadataError> {
        let name = self.aliases.real_name(short);
        if let Some(hit) = self.resolved.get(&name) {
            return Ok(hit.value().clone());
        }
        let suffix = format!("_{name}");
        let candidates: Vec<String> = self
            .types
            .read()
            .iter()
            .map(|t| t.name())
            .filter(|t| *t == name || t.ends_with(&suffix))
            .map(str::to_string)
            .collect();
        let resolved = match candidates.as_slice() {
            [] => name.clone(),
            [single] => single.clone(),
            _ => {
                return Err(MetadataError::Ambiguous { name, candidates });
            }
        };
        self.resolved.insert(name, resolved.clone());
        Ok(resolved)
    }

    /// Restore the registry to its freshly built state.
    pub fn clear(&self) {
        *self.types.write() = builtin_types();
        self.aliases.clear();
        self.reset_ignored();
        self.resolved.clear();
    }
}

/// Registered types answer for themselves: a type without documentation
/// reads as empty text, so other sources are never consulted for it.
impl DocSource for MetadataRegistry {
    fn doc_comment(&self, decl: &DeclarationId) -> Result<Option<String>, MetadataError> {
        match decl {
            DeclarationId::Type { name } => Ok(self
                .get(name)
                .map(|t| t.doc_text().unwrap_or_default().to_string())),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_alias_is_reserved() {
        let registry = MetadataRegistry::new();
        assert_eq!(registry.resolve("Target").unwrap(), TARGET_TYPE);
        assert!(matches!(
            registry.add_alias("Target", "Other"),
            Err(AliasError::Reserved { .. })
        ));
        assert_eq!(registry.add_alias("", "X"), Err(AliasError::Empty));
    }

    #[test]
    fn suffix_resolution() {
        let registry = MetadataRegistry::new();
        registry.register(MetadataType::new("Http_Verb_Get"));
        assert_eq!(registry.resolve("Get").unwrap(), "Http_Verb_Get");
        assert_eq!(registry.resolve("Verb_Get").unwrap(), "Http_Verb_Get");
        // "rb_Get" does not end on a segment boundary
        assert_eq!(registry.resolve("rb_Get").unwrap(), "rb_Get");
        assert_eq!(registry.resolve("Unknown").unwrap(), "Unknown");
    }

    #[test]
    fn ambiguity_names_every_candidate() {
        let registry = MetadataRegistry::new();
        registry.register(MetadataType::new("A_Column"));
        registry.register(MetadataType::new("B_Column"));
        match registry.resolve("Column") {
            Err(MetadataError::Ambiguous { name, candidates }) => {
                assert_eq!(name, "Column");
                assert_eq!(candidates, vec!["A_Column", "B_Column"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
        registry.add_alias("Column", "A_Column").unwrap();
        assert_eq!(registry.resolve("Column").unwrap(), "A_Column");
    }

    #[test]
    fn exact_name_and_suffix_are_both_candidates() {
        let registry = MetadataRegistry::new();
        registry.register(MetadataType::new("Get"));
        registry.register(MetadataType::new("Http_Get"));
        assert!(registry.resolve("Get").is_err());
    }

    #[test]
    fn registering_invalidates_resolution_cache() {
        let registry = MetadataRegistry::new();
        assert_eq!(registry.resolve("Put").unwrap(), "Put");
        registry.register(MetadataType::new("Http_Put"));
        assert_eq!(registry.resolve("Put").unwrap(), "Http_Put");
    }

    #[test]
    fn ignore_list_and_clear() {
        let registry = MetadataRegistry::new();
        registry.register(MetadataType::new("X_Y"));
        registry.ignore(["X_Y"]);
        assert!(registry.is_ignored("X_Y"));
        registry.clear();
        assert!(!registry.is_ignored("X_Y"));
        assert!(registry.get("X_Y").is_none());
        assert!(registry.get(TARGET_TYPE).is_some());
    }

    #[test]
    fn restricted_to_appends_target_tag() {
        let ty = MetadataType::new("V")
            .doc("A verb.")
            .restricted_to(&[Placement::Method, Placement::Nested]);
        assert_eq!(
            ty.doc_text(),
            Some("A verb.\n@Target({\"method\", \"nested\"})")
        );
        assert!(ty.has_field("value"));
    }
}
