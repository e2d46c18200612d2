use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::decl::DeclarationId;
use super::error::MetadataError;
use super::source::DocSource;

type TextSlot = Arc<OnceCell<Option<Arc<str>>>>;

/// Memoized documentation lookups, keyed by declaration.
///
/// The first lookup for a declaration asks the [`DocSource`]; later lookups
/// return the cached text. Concurrent first lookups for the same declaration
/// wait for a single source query. Failed lookups are not cached.
pub struct DocCommentCache {
    source: Arc<dyn DocSource>,
    cache: DashMap<DeclarationId, TextSlot>,
    lookups: AtomicUsize,
}

impl DocCommentCache {
    #[must_use]
    pub fn new(source: Arc<dyn DocSource>) -> Self {
        Self {
            source,
            cache: DashMap::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Documentation text attached to `decl`.
    ///
    /// # Errors
    ///
    /// Propagates the source's [`MetadataError`] for this declaration only.
    pub fn tags_for(&self, decl: &DeclarationId) -> Result<Option<Arc<str>>, MetadataError> {
        let slot = Arc::clone(self.cache.entry(decl.clone()).or_default().value());
        slot.get_or_try_init(|| {
            self.lookups.fetch_add(1, Ordering::Relaxed);
            self.source
                .doc_comment(decl)
                .map(|text| text.map(Arc::from))
        })
        .cloned()
    }

    /// Number of times the underlying source was queried.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}
