//! The sync-session contract and its implementations.
//!
//! A session owns one continuous or one-shot replication process for a
//! fixed set of collections. It runs on its own background execution
//! context and reports every internal state change over a status feed.

use crate::config::SessionConfig;
use crate::error::{SyncError, SyncResult};
use crate::status::{ActivityLevel, SyncStatus};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A replication session against a remote endpoint.
///
/// Implementations deliver [`SyncStatus`] events in the order they were
/// produced; subscribers must be registered before `start` to observe the
/// full lifecycle.
pub trait SyncSession: Send + Sync {
    /// Returns the session configuration.
    fn config(&self) -> &SessionConfig;

    /// Begins replicating. Returns immediately.
    fn start(&self) -> SyncResult<()>;

    /// Requests a graceful stop. The `Stopped` status arrives later over
    /// the feed.
    fn stop(&self) -> SyncResult<()>;

    /// Stops and releases the session. Subscribers see the feed close.
    fn close(&self) -> SyncResult<()>;

    /// Subscribes to status changes.
    fn subscribe(&self) -> Receiver<SyncStatus>;

    /// Returns the most recent status.
    fn status(&self) -> SyncStatus;
}

/// Distributes status changes to subscribers, preserving order.
pub(crate) struct StatusFeed {
    subscribers: Mutex<Vec<Sender<SyncStatus>>>,
    current: Mutex<SyncStatus>,
}

impl StatusFeed {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            current: Mutex::new(SyncStatus::default()),
        }
    }

    pub(crate) fn subscribe(&self) -> Receiver<SyncStatus> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub(crate) fn emit(&self, status: SyncStatus) {
        *self.current.lock() = status.clone();
        self.subscribers
            .lock()
            .retain(|tx| tx.send(status.clone()).is_ok());
    }

    pub(crate) fn current(&self) -> SyncStatus {
        self.current.lock().clone()
    }

    /// Drops every subscriber sender so receivers observe a closed feed.
    pub(crate) fn disconnect(&self) {
        self.subscribers.lock().clear();
    }
}

/// A session driven entirely by the caller.
///
/// Emits exactly the statuses the test pushes, in order. Optional start
/// scripts let a test choreograph what each `start` call produces.
pub struct ScriptedSession {
    config: SessionConfig,
    feed: StatusFeed,
    start_scripts: Mutex<VecDeque<Vec<SyncStatus>>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    closed: AtomicBool,
}

impl ScriptedSession {
    /// Creates a scripted session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            feed: StatusFeed::new(),
            start_scripts: Mutex::new(VecDeque::new()),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Emits one status to every subscriber.
    pub fn emit(&self, status: SyncStatus) {
        self.feed.emit(status);
    }

    /// Queues a batch of statuses emitted by the next `start` call.
    pub fn push_start_script(&self, batch: Vec<SyncStatus>) {
        self.start_scripts.lock().push_back(batch);
    }

    /// Number of `start` calls observed.
    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls observed.
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl SyncSession for ScriptedSession {
    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn start(&self) -> SyncResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SyncError::AlreadyClosed);
        }
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let batch = self.start_scripts.lock().pop_front();
        if let Some(batch) = batch {
            for status in batch {
                self.feed.emit(status);
            }
        }
        Ok(())
    }

    fn stop(&self) -> SyncResult<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> SyncResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.feed.disconnect();
        Ok(())
    }

    fn subscribe(&self) -> Receiver<SyncStatus> {
        self.feed.subscribe()
    }

    fn status(&self) -> SyncStatus {
        self.feed.current()
    }
}

/// A session that simulates a remote on a background thread.
///
/// On start it walks `CONNECTING -> BUSY`, then either settles in `IDLE`
/// (continuous) or finishes with `STOPPED` (one-shot). A stop request
/// surfaces as a `STOPPED` status from the worker, mirroring how a real
/// transport reports shutdown asynchronously. An empty username is
/// rejected with an authentication error carried on the final status.
pub struct LoopbackSession {
    config: SessionConfig,
    feed: Arc<StatusFeed>,
    running: Arc<AtomicBool>,
    closed: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    step: Duration,
}

impl LoopbackSession {
    /// Creates a loopback session with the default simulated transfer time.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            feed: Arc::new(StatusFeed::new()),
            running: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
            worker: Mutex::new(None),
            step: Duration::from_millis(25),
        }
    }

    /// Overrides the simulated transfer time per phase.
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    fn join_worker(&self) {
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

/// Sleeps for `step` in short slices, returning false as soon as the
/// session is asked to stop.
fn pause(running: &AtomicBool, step: Duration) -> bool {
    let slice = Duration::from_millis(5).min(step);
    let mut remaining = step;
    while remaining > Duration::ZERO {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let nap = slice.min(remaining);
        thread::sleep(nap);
        remaining = remaining.saturating_sub(nap);
    }
    running.load(Ordering::SeqCst)
}

impl SyncSession for LoopbackSession {
    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn start(&self) -> SyncResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SyncError::AlreadyClosed);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // A previous cycle may have finished on its own; reap it first.
        self.join_worker();

        let feed = Arc::clone(&self.feed);
        let running = Arc::clone(&self.running);
        let continuous = self.config.continuous;
        let authenticated = !self.config.credential.username().is_empty();
        let endpoint = self.config.endpoint.to_string();
        let step = self.step;

        let handle = thread::Builder::new()
            .name("caravel-loopback".into())
            .spawn(move || {
                feed.emit(SyncStatus::new(ActivityLevel::Connecting));
                if !authenticated {
                    running.store(false, Ordering::SeqCst);
                    feed.emit(SyncStatus::with_error(
                        ActivityLevel::Stopped,
                        format!("authentication failed for {endpoint}"),
                    ));
                    return;
                }
                if !pause(&running, step) {
                    feed.emit(SyncStatus::new(ActivityLevel::Stopped));
                    return;
                }
                feed.emit(SyncStatus::new(ActivityLevel::Busy));
                if !pause(&running, step) {
                    feed.emit(SyncStatus::new(ActivityLevel::Stopped));
                    return;
                }
                if continuous {
                    feed.emit(SyncStatus::new(ActivityLevel::Idle));
                    while pause(&running, step) {}
                    feed.emit(SyncStatus::new(ActivityLevel::Stopped));
                } else {
                    running.store(false, Ordering::SeqCst);
                    feed.emit(SyncStatus::new(ActivityLevel::Stopped));
                }
            })
            .map_err(|e| SyncError::session_fatal(format!("failed to spawn worker: {e}")))?;

        *self.worker.lock() = Some(handle);
        Ok(())
    }

    fn stop(&self) -> SyncResult<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> SyncResult<()> {
        self.running.store(false, Ordering::SeqCst);
        self.join_worker();
        self.closed.store(true, Ordering::SeqCst);
        self.feed.disconnect();
        Ok(())
    }

    fn subscribe(&self) -> Receiver<SyncStatus> {
        self.feed.subscribe()
    }

    fn status(&self) -> SyncStatus {
        self.feed.current()
    }
}
