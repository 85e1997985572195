//! # Caravel Store
//!
//! Embedded JSON document store for Caravel clients.
//!
//! This crate provides:
//! - A process-wide runtime with an explicit initialize/shutdown pair
//! - A `Store` facade with named scopes and collections
//! - `Collection` handles for document CRUD and ordered queries
//! - JSON document payloads (`Document`)
//!
//! ## Key Invariants
//!
//! - No store can be opened before [`runtime::initialize`] has run
//! - A closed store rejects every subsequent operation
//! - `find_all` returns documents ordered by id
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caravel_store::{runtime, Document, Store, StoreConfig};
//!
//! runtime::initialize();
//! let store = Store::open(StoreConfig::new("demo", "data/demo"))?;
//! let inventory = store.create_collection("retail", "inventory")?;
//!
//! let mut doc = Document::new("item:00001");
//! doc.set_string("type", "inventory");
//! inventory.save(doc)?;
//!
//! store.close()?;
//! runtime::shutdown();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod document;
mod error;
pub mod runtime;
mod store;

pub use collection::Collection;
pub use document::Document;
pub use error::{StoreError, StoreResult};
pub use store::{Store, StoreConfig};
