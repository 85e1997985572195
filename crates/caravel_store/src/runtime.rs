//! Process-wide store runtime.
//!
//! The store engine must be initialized exactly once before any store is
//! opened, and shut down when the process is done with it. Both calls are
//! owned by the process entry point; opening a store before
//! [`initialize`] has run fails with [`StoreError::NotInitialized`].

use crate::error::{StoreError, StoreResult};
use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the store runtime.
///
/// Idempotent: a second call is a no-op.
pub fn initialize() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("store runtime already initialized");
    } else {
        tracing::info!("store runtime initialized");
    }
}

/// Shuts the store runtime down.
///
/// Any store handle still alive becomes unusable for `open` purposes;
/// shutdown does not forcibly close open stores.
pub fn shutdown() {
    if INITIALIZED.swap(false, Ordering::SeqCst) {
        tracing::info!("store runtime shut down");
    }
}

/// Returns true if the runtime is initialized.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}

/// Fails with [`StoreError::NotInitialized`] unless [`initialize`] has run.
pub fn ensure_initialized() -> StoreResult<()> {
    if is_initialized() {
        Ok(())
    } else {
        Err(StoreError::NotInitialized)
    }
}
