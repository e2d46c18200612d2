use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::collection::{InstanceTarget, MetadataCollection, MetadataInstance, MetadataValue};
use super::decl::DeclarationId;
use super::error::MetadataError;
use super::parser::DocCommentCache;
use super::registry::{MetadataRegistry, MetadataType, Placement, TARGET_TYPE};
use super::source::{DocSource, LayeredDocs};
use super::tags::{parse_tags, RawTag, TagValue};

type CollectionSlot = Arc<OnceCell<Arc<MetadataCollection>>>;

/// Construction state of one top-level build.
#[derive(Debug, Default)]
struct BuildContext {
    /// Metadata types currently being constructed
    constructing: Vec<String>,
    /// Declarations whose collection is currently being built
    building: Vec<DeclarationId>,
}

/// Builds and memoizes the [`MetadataCollection`] of each declaration.
///
/// Top-level builds go through a per-declaration single-flight cell:
/// concurrent callers for the same uncached declaration wait for one build
/// and all receive the same `Arc`. Collections needed while building another
/// one (the own metadata of a metadata type, read for its `@Target`) are
/// taken from the cache when present and otherwise computed without caching,
/// so a build never waits on another build.
pub struct MetadataBuilder {
    registry: Arc<MetadataRegistry>,
    docs: DocCommentCache,
    cache: DashMap<DeclarationId, CollectionSlot>,
    builds: AtomicUsize,
}

impl MetadataBuilder {
    /// Create a builder reading declarations from `source`.
    ///
    /// Documentation of registered metadata types is served by the registry
    /// and takes precedence over `source`.
    #[must_use]
    pub fn new(registry: Arc<MetadataRegistry>, source: Arc<dyn DocSource>) -> Self {
        let registry_docs: Arc<dyn DocSource> = Arc::<MetadataRegistry>::clone(&registry);
        let layered = LayeredDocs::new(vec![registry_docs, source]);
        Self {
            registry,
            docs: DocCommentCache::new(Arc::new(layered)),
            cache: DashMap::new(),
            builds: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// Canonical metadata type name for a short tag name.
    ///
    /// # Errors
    ///
    /// [`MetadataError::Ambiguous`] when several types match.
    pub fn resolve_name(&self, short: &str) -> Result<String, MetadataError> {
        self.registry.resolve(short)
    }

    /// Metadata attached to `decl`, built on first request.
    ///
    /// # Errors
    ///
    /// Any [`MetadataError`] raised while building this declaration. Failures
    /// are not cached; the next call retries.
    pub fn build(&self, decl: &DeclarationId) -> Result<Arc<MetadataCollection>, MetadataError> {
        let slot = Arc::clone(self.cache.entry(decl.clone()).or_default().value());
        slot.get_or_try_init(|| {
            let mut ctx = BuildContext::default();
            let collection = self.build_uncached(decl, &mut ctx)?;
            self.builds.fetch_add(1, Ordering::Relaxed);
            debug!(
                declaration = %decl,
                metadata_types = ?collection.type_names().collect::<Vec<_>>(),
                "Metadata collection built"
            );
            Ok(Arc::new(collection))
        })
        .map(Arc::clone)
    }

    /// Number of top-level collections built so far.
    #[must_use]
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Number of documentation source lookups so far.
    #[must_use]
    pub fn doc_lookups(&self) -> usize {
        self.docs.lookups()
    }

    /// Forget every cached collection and documentation text.
    pub fn clear(&self) {
        self.cache.clear();
        self.docs.clear();
    }

    fn build_nested(
        &self,
        decl: &DeclarationId,
        ctx: &mut BuildContext,
    ) -> Result<Arc<MetadataCollection>, MetadataError> {
        if ctx.building.contains(decl) {
            return Err(MetadataError::CircularReference {
                name: decl.to_string(),
            });
        }
        let cached = self
            .cache
            .get(decl)
            .and_then(|slot| slot.get().map(Arc::clone));
        match cached {
            Some(collection) => Ok(collection),
            None => self.build_uncached(decl, ctx).map(Arc::new),
        }
    }

    fn build_uncached(
        &self,
        decl: &DeclarationId,
        ctx: &mut BuildContext,
    ) -> Result<MetadataCollection, MetadataError> {
        ctx.building.push(decl.clone());
        let result = self.collect(decl, ctx);
        ctx.building.pop();
        result
    }

    fn collect(
        &self,
        decl: &DeclarationId,
        ctx: &mut BuildContext,
    ) -> Result<MetadataCollection, MetadataError> {
        let mut collection = MetadataCollection::default();
        let Some(text) = self.docs.tags_for(decl)? else {
            return Ok(collection);
        };
        let tags = parse_tags(&text).map_err(|source| MetadataError::Syntax {
            declaration: decl.to_string(),
            source,
        })?;
        for tag in &tags {
            let target = InstanceTarget::Declaration(decl.clone());
            if let Some(instance) = self.instantiate(tag, target, ctx)? {
                collection.push(instance);
            }
        }
        Ok(collection)
    }

    fn instantiate(
        &self,
        tag: &RawTag,
        target: InstanceTarget,
        ctx: &mut BuildContext,
    ) -> Result<Option<Arc<MetadataInstance>>, MetadataError> {
        let canonical = self.registry.resolve(&tag.name)?;
        let Some(ty) = self.registry.get(&canonical) else {
            debug!(tag = %tag.name, "Skipping tag without a registered metadata type");
            return Ok(None);
        };
        if self.registry.is_ignored(&canonical) {
            debug!(metadata_type = %canonical, "Skipping ignored metadata type");
            return Ok(None);
        }
        if ctx.constructing.contains(&canonical) {
            return Err(MetadataError::CircularReference { name: canonical });
        }
        ctx.constructing.push(canonical);
        let result = self.construct(&ty, tag, target, ctx);
        ctx.constructing.pop();
        result.map(|instance| Some(Arc::new(instance)))
    }

    fn construct(
        &self,
        ty: &MetadataType,
        tag: &RawTag,
        target: InstanceTarget,
        ctx: &mut BuildContext,
    ) -> Result<MetadataInstance, MetadataError> {
        let mut fields = BTreeMap::new();
        for (key, value) in &tag.params {
            if ty.has_field(key) {
                fields.insert(key.clone(), self.realize(value, ctx)?);
            } else {
                warn!(
                    metadata_type = %ty.name(),
                    parameter = %key,
                    "Parameter not defined for metadata type, dropped"
                );
            }
        }
        self.check_target(ty, &target, ctx)?;
        Ok(MetadataInstance {
            type_name: ty.name().to_string(),
            target,
            fields,
        })
    }

    fn realize(
        &self,
        value: &TagValue,
        ctx: &mut BuildContext,
    ) -> Result<MetadataValue, MetadataError> {
        Ok(match value {
            TagValue::Null => MetadataValue::Null,
            TagValue::Bool(b) => MetadataValue::Bool(*b),
            TagValue::Int(i) => MetadataValue::Int(*i),
            TagValue::Float(f) => MetadataValue::Float(*f),
            TagValue::Str(s) => MetadataValue::Str(s.clone()),
            TagValue::List(items) => MetadataValue::List(
                items
                    .iter()
                    .map(|item| self.realize(item, ctx))
                    .collect::<Result<_, _>>()?,
            ),
            TagValue::Map(entries) => MetadataValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.realize(v, ctx)?)))
                    .collect::<Result<_, MetadataError>>()?,
            ),
            TagValue::Tag(raw) => match self.instantiate(raw, InstanceTarget::Nested, ctx)? {
                Some(instance) => MetadataValue::Metadata(instance),
                None => MetadataValue::Null,
            },
        })
    }

    /// Enforce the `@Target` restriction declared on the metadata type itself.
    fn check_target(
        &self,
        ty: &MetadataType,
        target: &InstanceTarget,
        ctx: &mut BuildContext,
    ) -> Result<(), MetadataError> {
        let own = self.build_nested(&DeclarationId::of_type(ty.name()), ctx)?;
        let Some(restriction) = own.latest(TARGET_TYPE) else {
            return Ok(());
        };
        let placement = match target {
            InstanceTarget::Declaration(decl) => Placement::of(decl.kind()),
            InstanceTarget::Nested => Placement::Nested,
        };
        let allowed = restriction
            .value()
            .map(MetadataValue::strings)
            .unwrap_or_default()
            .into_iter()
            .any(|s| s.parse::<Placement>().is_ok_and(|p| p == placement));
        if allowed {
            return Ok(());
        }
        Err(match target {
            InstanceTarget::Nested => MetadataError::NestingNotAllowed {
                metadata: ty.name().to_string(),
            },
            InstanceTarget::Declaration(decl) => MetadataError::PlacementViolation {
                metadata: ty.name().to_string(),
                target: decl.to_string(),
            },
        })
    }
}
