use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::decl::DeclarationId;
use super::error::MetadataError;
use super::scanner::{scan, ScannedUnit};

/// Where documentation text for a declaration comes from.
///
/// Implementations must be cheap to query repeatedly; the metadata parser
/// memoizes results per declaration anyway.
pub trait DocSource: Send + Sync {
    /// Documentation text attached to `decl`, or `None` when it has none.
    ///
    /// # Errors
    ///
    /// [`MetadataError::MalformedSource`] when the text cannot be located
    /// because the underlying source is malformed.
    fn doc_comment(&self, decl: &DeclarationId) -> Result<Option<String>, MetadataError>;
}

/// Documentation registered explicitly at startup.
#[derive(Debug, Clone, Default)]
pub struct NativeDocs {
    docs: HashMap<DeclarationId, String>,
}

impl NativeDocs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, decl: DeclarationId, text: impl Into<String>) {
        self.docs.insert(decl, text.into());
    }

    #[must_use]
    pub fn with(mut self, decl: DeclarationId, text: impl Into<String>) -> Self {
        self.insert(decl, text);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl DocSource for NativeDocs {
    fn doc_comment(&self, decl: &DeclarationId) -> Result<Option<String>, MetadataError> {
        Ok(self.docs.get(decl).cloned())
    }
}

/// Several sources queried in order; the first one with text wins.
#[derive(Clone, Default)]
pub struct LayeredDocs {
    layers: Vec<Arc<dyn DocSource>>,
}

impl LayeredDocs {
    #[must_use]
    pub fn new(layers: Vec<Arc<dyn DocSource>>) -> Self {
        Self { layers }
    }

    pub fn push(&mut self, layer: Arc<dyn DocSource>) {
        self.layers.push(layer);
    }
}

impl DocSource for LayeredDocs {
    fn doc_comment(&self, decl: &DeclarationId) -> Result<Option<String>, MetadataError> {
        for layer in &self.layers {
            if let Some(text) = layer.doc_comment(decl)? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

struct SourceUnit {
    name: String,
    text: String,
    scanned: OnceCell<ScannedUnit>,
}

/// Documentation read from Rust source text.
///
/// Each unit is scanned once, on the first lookup that needs it. A unit that
/// fails to scan still answers for the declarations found before the failure.
#[derive(Default)]
pub struct SourceDocs {
    units: Vec<SourceUnit>,
    scans: AtomicUsize,
}

impl SourceDocs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named unit of source text, typically `include_str!("svc.rs")`.
    #[must_use]
    pub fn with_unit(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.add_unit(name, text);
        self
    }

    pub fn add_unit(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.units.push(SourceUnit {
            name: name.into(),
            text: text.into(),
            scanned: OnceCell::new(),
        });
    }

    /// Read a unit from disk.
    ///
    /// # Errors
    ///
    /// Propagates the I/O error when the file cannot be read.
    pub fn add_file(&mut self, path: &Path) -> io::Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.add_unit(path.display().to_string(), text);
        Ok(())
    }

    /// Number of units scanned so far.
    #[must_use]
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    fn scanned<'a>(&self, unit: &'a SourceUnit) -> &'a ScannedUnit {
        unit.scanned.get_or_init(|| {
            self.scans.fetch_add(1, Ordering::Relaxed);
            let scanned = scan(&unit.name, &unit.text);
            debug!(
                unit = %unit.name,
                declarations = scanned.docs.len(),
                failed = scanned.error.is_some(),
                "Scanned documentation source"
            );
            scanned
        })
    }
}

impl DocSource for SourceDocs {
    fn doc_comment(&self, decl: &DeclarationId) -> Result<Option<String>, MetadataError> {
        let mut owner_error = None;
        let mut any_error = None;
        let mut owner_seen = false;
        for unit in &self.units {
            let scanned = self.scanned(unit);
            if let Some(text) = scanned.docs.get(decl) {
                return Ok(Some(text.clone()));
            }
            let declares_owner = scanned.types.contains(decl.owner());
            owner_seen |= declares_owner;
            if let Some(err) = &scanned.error {
                if declares_owner && owner_error.is_none() {
                    owner_error = Some(err.clone());
                }
                if any_error.is_none() {
                    any_error = Some(err.clone());
                }
            }
        }
        if let Some(err) = owner_error {
            return Err(err);
        }
        match any_error {
            Some(err) if !owner_seen => Err(err),
            _ => Ok(None),
        }
    }
}
