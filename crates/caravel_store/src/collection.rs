//! Collection handles.

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A named collection of documents within a scope.
///
/// Handles are cheap to clone and share the underlying table. All
/// operations fail with [`StoreError::Closed`] once the owning store has
/// been closed.
#[derive(Clone)]
pub struct Collection {
    scope: String,
    name: String,
    store_name: String,
    docs: Arc<RwLock<BTreeMap<String, Document>>>,
    store_open: Arc<AtomicBool>,
}

impl Collection {
    pub(crate) fn new(
        scope: impl Into<String>,
        name: impl Into<String>,
        store_name: impl Into<String>,
        store_open: Arc<AtomicBool>,
    ) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
            store_name: store_name.into(),
            docs: Arc::new(RwLock::new(BTreeMap::new())),
            store_open,
        }
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scope name.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns `scope.name`.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.scope, self.name)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.store_open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Closed {
                name: self.store_name.clone(),
            })
        }
    }

    /// Returns the number of documents in the collection.
    pub fn count(&self) -> StoreResult<u64> {
        self.ensure_open()?;
        Ok(self.docs.read().len() as u64)
    }

    /// Gets a document by id.
    pub fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        self.ensure_open()?;
        Ok(self.docs.read().get(id).cloned())
    }

    /// Saves a document, replacing any previous version with the same id.
    pub fn save(&self, doc: Document) -> StoreResult<()> {
        self.ensure_open()?;
        if doc.id().is_empty() {
            return Err(StoreError::InvalidDocument {
                id: String::new(),
                reason: "empty document id".into(),
            });
        }
        self.docs.write().insert(doc.id().to_string(), doc);
        Ok(())
    }

    /// Deletes a document by id. Returns true if it existed.
    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        Ok(self.docs.write().remove(id).is_some())
    }

    /// Returns all documents, ordered by id.
    pub fn find_all(&self) -> StoreResult<Vec<Document>> {
        self.ensure_open()?;
        Ok(self.docs.read().values().cloned().collect())
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("scope", &self.scope)
            .field("name", &self.name)
            .finish()
    }
}
