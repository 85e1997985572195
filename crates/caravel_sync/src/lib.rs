//! # Caravel Sync
//!
//! Replication lifecycle coordination for Caravel clients.
//!
//! This crate provides:
//! - Activity levels and status snapshots for a replication session
//! - The sync-session contract, with scripted and loopback implementations
//! - Collection resolution against the filters a client requests
//! - Retry with exponential backoff
//! - The [`Coordinator`], which owns a session, applies its status feed in
//!   order, and exposes `start`/`stop`/`is_active`/`await_state`
//!
//! ## Architecture
//!
//! A [`SyncSession`] runs on its own background execution context and
//! delivers [`SyncStatus`] events over a channel. The [`Coordinator`]
//! drains that channel on a dedicated thread, caches the latest status
//! behind a mutex + condvar cell, and evaluates the unexpected-stop policy
//! whenever a continuous session reports `Stopped` without having been
//! asked to.
//!
//! ## Key Invariants
//!
//! - Exactly one session is active per coordinator
//! - Status events are applied in delivery order, none dropped
//! - The cached status is written only by the coordinator's drain thread
//! - `await_state` is bounded by its timeout, never an open-ended wait

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
mod resolver;
mod session;
mod status;

pub use config::{
    AuthCredential, EndpointScheme, PartitionFilter, RetryConfig, SessionConfig, StopPolicy,
    SyncEndpoint,
};
pub use coordinator::Coordinator;
pub use error::{SyncError, SyncResult};
pub use resolver::{resolve_collections, EVERYTHING};
pub use session::{LoopbackSession, ScriptedSession, SyncSession};
pub use status::{ActivityLevel, SyncStatus};
