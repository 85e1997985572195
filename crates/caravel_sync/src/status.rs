//! Activity levels and status snapshots.

use std::fmt;

/// The coarse-grained state of a replication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityLevel {
    /// The session has ended (or never started).
    Stopped,
    /// The remote is unreachable; the session retries on its own.
    Offline,
    /// The session is establishing a connection.
    Connecting,
    /// Caught up and watching for changes. Only meaningful when continuous.
    Idle,
    /// Actively transferring documents.
    Busy,
}

impl ActivityLevel {
    /// Returns true for the quiescent levels, `Stopped` and `Idle`.
    pub fn is_quiescent(&self) -> bool {
        matches!(self, ActivityLevel::Stopped | ActivityLevel::Idle)
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityLevel::Stopped => "STOPPED",
            ActivityLevel::Offline => "OFFLINE",
            ActivityLevel::Connecting => "CONNECTING",
            ActivityLevel::Idle => "IDLE",
            ActivityLevel::Busy => "BUSY",
        };
        f.write_str(name)
    }
}

/// A status snapshot produced by a session on every internal state change.
///
/// Transient: the coordinator retains only the most recent value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Activity level at the time of the change.
    pub activity: ActivityLevel,
    /// Error carried with the change, if any.
    pub last_error: Option<String>,
}

impl SyncStatus {
    /// Creates a status without an error.
    pub fn new(activity: ActivityLevel) -> Self {
        Self {
            activity,
            last_error: None,
        }
    }

    /// Creates a status carrying an error.
    pub fn with_error(activity: ActivityLevel, error: impl Into<String>) -> Self {
        Self {
            activity,
            last_error: Some(error.into()),
        }
    }

    /// Returns true unless the activity level is `Stopped`.
    ///
    /// Errors do not affect activity; only the level governs it.
    pub fn is_active(&self) -> bool {
        self.activity != ActivityLevel::Stopped
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::new(ActivityLevel::Stopped)
    }
}
