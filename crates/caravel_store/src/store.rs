//! Store facade.

use crate::collection::Collection;
use crate::error::{StoreError, StoreResult};
use crate::runtime;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store name.
    pub name: String,
    /// Directory holding the store's on-disk layout.
    pub directory: PathBuf,
    /// Delete any previous directory contents on open.
    pub flush_previous: bool,
}

impl StoreConfig {
    /// Creates a configuration with flushing disabled.
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            flush_previous: false,
        }
    }

    /// Sets whether the previous directory is deleted on open.
    pub fn with_flush_previous(mut self, flush: bool) -> Self {
        self.flush_previous = flush;
        self
    }
}

/// The main store handle.
///
/// A store groups collections under named scopes. Collections live in
/// memory; the directory exists so that open/flush semantics match a
/// persistent deployment.
pub struct Store {
    config: StoreConfig,
    scopes: RwLock<BTreeMap<String, BTreeMap<String, Collection>>>,
    open: Arc<AtomicBool>,
}

impl Store {
    /// Opens a store.
    ///
    /// Fails with [`StoreError::NotInitialized`] unless
    /// [`runtime::initialize`] has run. When `flush_previous` is set, any
    /// existing directory is deleted first.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        runtime::ensure_initialized()?;

        if config.flush_previous && config.directory.exists() {
            tracing::info!(path = %config.directory.display(), "flushing previous store directory");
            std::fs::remove_dir_all(&config.directory)?;
        }
        std::fs::create_dir_all(&config.directory)?;
        tracing::info!(name = %config.name, path = %config.directory.display(), "store opened");

        Ok(Self {
            config,
            scopes: RwLock::new(BTreeMap::new()),
            open: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Returns the store name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the store directory.
    pub fn path(&self) -> &Path {
        &self.config.directory
    }

    /// Returns true until [`Store::close`] has run.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::Closed {
                name: self.config.name.clone(),
            })
        }
    }

    /// Creates a collection in a scope, or returns the existing one.
    pub fn create_collection(&self, scope: &str, name: &str) -> StoreResult<Collection> {
        self.ensure_open()?;
        let mut scopes = self.scopes.write();
        let collections = scopes.entry(scope.to_string()).or_default();
        if let Some(existing) = collections.get(name) {
            return Ok(existing.clone());
        }
        let collection = Collection::new(scope, name, &self.config.name, Arc::clone(&self.open));
        collections.insert(name.to_string(), collection.clone());
        tracing::debug!(collection = %collection.full_name(), "collection created");
        Ok(collection)
    }

    /// Gets a collection by scope and name.
    pub fn collection(&self, scope: &str, name: &str) -> StoreResult<Collection> {
        self.ensure_open()?;
        self.scopes
            .read()
            .get(scope)
            .and_then(|c| c.get(name))
            .cloned()
            .ok_or_else(|| StoreError::CollectionNotFound {
                scope: scope.to_string(),
                name: name.to_string(),
            })
    }

    /// Returns the collections in a scope, ordered by name.
    ///
    /// A scope that has never held a collection is
    /// [`StoreError::ScopeNotFound`].
    pub fn collections_in_scope(&self, scope: &str) -> StoreResult<Vec<Collection>> {
        self.ensure_open()?;
        self.scopes
            .read()
            .get(scope)
            .map(|c| c.values().cloned().collect())
            .ok_or_else(|| StoreError::ScopeNotFound {
                name: scope.to_string(),
            })
    }

    /// Closes the store. Idempotent.
    ///
    /// Every collection handle handed out by this store starts failing
    /// with [`StoreError::Closed`] once close returns.
    pub fn close(&self) -> StoreResult<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            tracing::info!(name = %self.config.name, "store closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.config.name)
            .field("open", &self.is_open())
            .finish()
    }
}
