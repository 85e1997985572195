//! Replication lifecycle coordination.
//!
//! The coordinator owns one sync session, drains its status feed on a
//! dedicated thread, and exposes the session's lifecycle to a foreground
//! caller. The cached status is written only by the drain thread; readers
//! take the cell lock for the duration of a clone, never across a wait,
//! so `is_active` can run concurrently with event delivery.

use crate::config::{RetryConfig, StopPolicy};
use crate::error::{SyncError, SyncResult};
use crate::session::SyncSession;
use crate::status::{ActivityLevel, SyncStatus};
use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Callback invoked whenever the session reaches a quiescent level.
///
/// Must not block: it runs on the drain thread, ahead of every
/// not-yet-applied status event.
pub type QuiescentObserver = Box<dyn Fn(ActivityLevel) + Send + Sync>;

/// The latest observed status, plus the condvar `await_state` sleeps on.
struct StatusCell {
    status: Mutex<SyncStatus>,
    changed: Condvar,
}

impl StatusCell {
    fn new() -> Self {
        Self {
            status: Mutex::new(SyncStatus::default()),
            changed: Condvar::new(),
        }
    }

    fn publish(&self, status: SyncStatus) {
        *self.status.lock() = status;
        self.changed.notify_all();
    }

    fn snapshot(&self) -> SyncStatus {
        self.status.lock().clone()
    }

    fn wait_for(&self, target: ActivityLevel, timeout: Duration) -> SyncResult<()> {
        let deadline = Instant::now() + timeout;
        let mut status = self.status.lock();
        loop {
            if status.activity == target {
                return Ok(());
            }
            if self.changed.wait_until(&mut status, deadline).timed_out() {
                if status.activity == target {
                    return Ok(());
                }
                return Err(SyncError::Timeout {
                    target,
                    waited: timeout,
                });
            }
        }
    }
}

struct Inner {
    session: Arc<dyn SyncSession>,
    continuous: bool,
    policy: StopPolicy,
    cell: StatusCell,
    /// Set by `start`, cleared once a final `Stopped` has been observed.
    start_pending: AtomicBool,
    /// Set by `stop`; distinguishes a requested stop from an anomaly.
    stop_requested: AtomicBool,
    restart_attempts: AtomicU32,
    quiescent_observer: RwLock<Option<QuiescentObserver>>,
}

/// Coordinates the lifecycle of one replication session.
///
/// Exactly one session is active per coordinator. `start` and `stop` are
/// idempotent and non-blocking; callers that need a state observed pair
/// them with [`Coordinator::await_state`].
pub struct Coordinator {
    inner: Arc<Inner>,
    drain: Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    /// Creates a coordinator for a session and subscribes to its feed.
    ///
    /// The drain thread is spawned immediately so no event emitted after
    /// construction can be missed.
    pub fn new(session: Arc<dyn SyncSession>, policy: StopPolicy) -> Self {
        let continuous = session.config().continuous;
        let inner = Arc::new(Inner {
            session: Arc::clone(&session),
            continuous,
            policy,
            cell: StatusCell::new(),
            start_pending: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            restart_attempts: AtomicU32::new(0),
            quiescent_observer: RwLock::new(None),
        });

        let rx = session.subscribe();
        let drain_inner = Arc::clone(&inner);
        let drain = match thread::Builder::new()
            .name("caravel-coordinator".into())
            .spawn(move || {
                while let Ok(status) = rx.recv() {
                    Self::apply(&drain_inner, status);
                }
                tracing::debug!("status feed closed");
            }) {
            Ok(handle) => Some(handle),
            Err(error) => {
                tracing::error!(%error, "failed to spawn status drain thread");
                None
            }
        };

        Self {
            inner,
            drain: Mutex::new(drain),
        }
    }

    /// Registers a callback for quiescent levels (`IDLE`, `STOPPED`).
    pub fn set_quiescent_observer(&self, observer: QuiescentObserver) {
        *self.inner.quiescent_observer.write() = Some(observer);
    }

    /// Triggers the session. Idempotent, returns immediately.
    ///
    /// A second call before the first lifecycle has ended is a no-op.
    pub fn start(&self) -> SyncResult<()> {
        if self.inner.start_pending.swap(true, Ordering::SeqCst) {
            tracing::debug!("replication already started");
            return Ok(());
        }
        self.inner.stop_requested.store(false, Ordering::SeqCst);
        self.inner.restart_attempts.store(0, Ordering::SeqCst);
        tracing::info!("starting replication");
        if let Err(e) = self.inner.session.start() {
            self.inner.start_pending.store(false, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    /// Requests a graceful stop. Idempotent, returns immediately.
    ///
    /// The `STOPPED` status may not have been observed by the time this
    /// returns; pair with `await_state(Stopped, ..)` for that guarantee.
    pub fn stop(&self) -> SyncResult<()> {
        if !self.inner.start_pending.load(Ordering::SeqCst) && !self.is_active() {
            tracing::debug!("replication already stopped");
            return Ok(());
        }
        if self.inner.stop_requested.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!("stopping replication");
        self.inner.session.stop()
    }

    /// Returns true if the owned session is continuous.
    pub fn continuous(&self) -> bool {
        self.inner.continuous
    }

    /// Returns true unless the last observed level is `STOPPED`.
    pub fn is_active(&self) -> bool {
        self.inner.cell.snapshot().is_active()
    }

    /// Returns the last observed status.
    pub fn status(&self) -> SyncStatus {
        self.inner.cell.snapshot()
    }

    /// Blocks until the cached level equals `target` or `timeout` elapses.
    ///
    /// Returns immediately when the target is already satisfied; fails
    /// with [`SyncError::Timeout`] otherwise, leaving the coordinator
    /// fully usable.
    pub fn await_state(&self, target: ActivityLevel, timeout: Duration) -> SyncResult<()> {
        self.inner.cell.wait_for(target, timeout)
    }

    /// Stops the session, closes it, and reaps the drain thread.
    pub fn close(&self) -> SyncResult<()> {
        self.inner.stop_requested.store(true, Ordering::SeqCst);
        let _ = self.inner.session.stop();
        self.inner.session.close()?;
        if let Some(handle) = self.drain.lock().take() {
            let _ = handle.join();
        }
        Ok(())
    }

    /// Applies one status event. Runs only on the drain thread, in
    /// delivery order.
    fn apply(inner: &Inner, status: SyncStatus) {
        match &status.last_error {
            Some(error) => {
                tracing::warn!(activity = %status.activity, %error, "replication status")
            }
            None => tracing::info!(activity = %status.activity, "replication status"),
        }

        let unexpected_stop = status.activity == ActivityLevel::Stopped
            && inner.continuous
            && !inner.stop_requested.load(Ordering::SeqCst);

        if matches!(status.activity, ActivityLevel::Busy | ActivityLevel::Idle) {
            inner.restart_attempts.store(0, Ordering::SeqCst);
        }

        inner.cell.publish(status.clone());

        if status.activity.is_quiescent() {
            if let Some(observe) = inner.quiescent_observer.read().as_ref() {
                observe(status.activity);
            }
        }

        if status.activity == ActivityLevel::Stopped {
            if unexpected_stop {
                Self::handle_unexpected_stop(inner, &status);
            } else {
                inner.start_pending.store(false, Ordering::SeqCst);
            }
        }
    }

    /// A continuous session is expected to idle, not stop; decide between
    /// halting and a bounded restart.
    fn handle_unexpected_stop(inner: &Inner, status: &SyncStatus) {
        let error = status.last_error.as_deref().unwrap_or("no error reported");
        match &inner.policy {
            StopPolicy::Halt => {
                tracing::error!(%error, "continuous replication stopped unexpectedly; not restarting");
                inner.start_pending.store(false, Ordering::SeqCst);
            }
            StopPolicy::Retry(retry) => {
                Self::restart_with_backoff(inner, retry, error);
            }
        }
    }

    fn restart_with_backoff(inner: &Inner, retry: &RetryConfig, error: &str) {
        let attempt = inner.restart_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt > retry.max_attempts {
            tracing::error!(
                %error,
                attempts = retry.max_attempts,
                "continuous replication stopped unexpectedly; giving up after restart attempts"
            );
            inner.start_pending.store(false, Ordering::SeqCst);
            return;
        }

        let delay = retry.delay_for_attempt(attempt);
        tracing::warn!(
            %error,
            attempt,
            max_attempts = retry.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "continuous replication stopped unexpectedly; restarting"
        );
        thread::sleep(delay);

        if inner.stop_requested.load(Ordering::SeqCst) {
            inner.start_pending.store(false, Ordering::SeqCst);
            return;
        }
        if let Err(e) = inner.session.start() {
            tracing::error!(error = %e, "restart failed");
            inner.start_pending.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthCredential, PartitionFilter, SessionConfig, SyncEndpoint};
    use crate::session::ScriptedSession;
    use proptest::prelude::*;

    fn session(continuous: bool) -> Arc<ScriptedSession> {
        let config = SessionConfig::new(
            SyncEndpoint::parse("ws://127.0.0.1:4984/db").unwrap(),
            AuthCredential::new("userdb1", "Password1!"),
        )
        .with_continuous(continuous)
        .with_collections(vec![PartitionFilter::replicate_all("inventory")]);
        Arc::new(ScriptedSession::new(config))
    }

    fn wait_until(condition: impl Fn() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    #[test]
    fn initial_state_is_stopped() {
        let session = session(false);
        let coordinator = Coordinator::new(session, StopPolicy::Halt);
        assert!(!coordinator.is_active());
        assert_eq!(coordinator.status().activity, ActivityLevel::Stopped);
    }

    #[test]
    fn start_is_idempotent() {
        let session = session(true);
        let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, StopPolicy::Halt);

        coordinator.start().unwrap();
        coordinator.start().unwrap();
        assert_eq!(session.start_calls(), 1);

        session.emit(SyncStatus::new(ActivityLevel::Connecting));
        coordinator
            .await_state(ActivityLevel::Connecting, Duration::from_secs(2))
            .unwrap();
        coordinator.start().unwrap();
        assert_eq!(session.start_calls(), 1);
    }

    #[test]
    fn stop_is_idempotent_and_noop_when_stopped() {
        let session = session(true);
        let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, StopPolicy::Halt);

        // Never started: nothing to stop.
        coordinator.stop().unwrap();
        assert_eq!(session.stop_calls(), 0);

        coordinator.start().unwrap();
        session.emit(SyncStatus::new(ActivityLevel::Busy));
        coordinator
            .await_state(ActivityLevel::Busy, Duration::from_secs(2))
            .unwrap();

        coordinator.stop().unwrap();
        coordinator.stop().unwrap();
        assert_eq!(session.stop_calls(), 1);

        session.emit(SyncStatus::new(ActivityLevel::Stopped));
        coordinator
            .await_state(ActivityLevel::Stopped, Duration::from_secs(2))
            .unwrap();
        assert!(!coordinator.is_active());
    }

    #[test]
    fn await_state_fast_path_when_already_satisfied() {
        let session = session(false);
        let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, StopPolicy::Halt);

        // Initial state is Stopped; even a zero timeout succeeds.
        coordinator
            .await_state(ActivityLevel::Stopped, Duration::ZERO)
            .unwrap();
    }

    #[test]
    fn await_state_times_out_and_coordinator_stays_usable() {
        let session = session(true);
        let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, StopPolicy::Halt);
        coordinator.start().unwrap();

        let err = coordinator
            .await_state(ActivityLevel::Idle, Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, SyncError::Timeout { target: ActivityLevel::Idle, .. }));

        // No leaked lock: the next wait succeeds once the event arrives.
        session.emit(SyncStatus::new(ActivityLevel::Idle));
        coordinator
            .await_state(ActivityLevel::Idle, Duration::from_secs(2))
            .unwrap();
        assert!(coordinator.is_active());
    }

    #[test]
    fn errors_do_not_change_activity() {
        let session = session(true);
        let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, StopPolicy::Halt);
        coordinator.start().unwrap();

        session.emit(SyncStatus::new(ActivityLevel::Busy));
        session.emit(SyncStatus::with_error(ActivityLevel::Busy, "transient write failure"));
        assert!(wait_until(
            || coordinator.status().last_error.is_some(),
            Duration::from_secs(2)
        ));
        assert!(coordinator.is_active());
    }

    #[test]
    fn rapid_events_settle_on_the_last_one() {
        let session = session(false);
        let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, StopPolicy::Halt);
        coordinator.start().unwrap();

        // Leave the initial Stopped state first so the final wait below
        // can only be satisfied by the last event of the burst.
        session.emit(SyncStatus::new(ActivityLevel::Busy));
        coordinator
            .await_state(ActivityLevel::Busy, Duration::from_secs(2))
            .unwrap();

        session.emit(SyncStatus::new(ActivityLevel::Idle));
        session.emit(SyncStatus::new(ActivityLevel::Stopped));

        coordinator
            .await_state(ActivityLevel::Stopped, Duration::from_secs(2))
            .unwrap();
        assert!(!coordinator.is_active());
        assert_eq!(coordinator.status().activity, ActivityLevel::Stopped);
    }

    #[test]
    fn unexpected_stop_with_halt_policy_stays_stopped() {
        let session = session(true);
        let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, StopPolicy::Halt);
        coordinator.start().unwrap();

        for level in [
            ActivityLevel::Connecting,
            ActivityLevel::Busy,
            ActivityLevel::Idle,
        ] {
            session.emit(SyncStatus::new(level));
        }
        coordinator
            .await_state(ActivityLevel::Idle, Duration::from_secs(5))
            .unwrap();
        assert!(coordinator.is_active());

        session.emit(SyncStatus::with_error(
            ActivityLevel::Stopped,
            "connection reset by peer",
        ));
        coordinator
            .await_state(ActivityLevel::Stopped, Duration::from_secs(5))
            .unwrap();
        assert!(!coordinator.is_active());
        assert_eq!(session.start_calls(), 1);

        // Stopped is terminal until start() is invoked again.
        coordinator.start().unwrap();
        assert_eq!(session.start_calls(), 2);
    }

    #[test]
    fn unexpected_stop_with_retry_policy_restarts() {
        let session = session(true);
        let policy = StopPolicy::Retry(
            RetryConfig::new(3)
                .with_initial_delay(Duration::from_millis(5))
                .with_jitter(false),
        );
        let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, policy);

        session.push_start_script(vec![
            SyncStatus::new(ActivityLevel::Connecting),
            SyncStatus::new(ActivityLevel::Busy),
            SyncStatus::with_error(ActivityLevel::Stopped, "connection reset by peer"),
        ]);
        session.push_start_script(vec![
            SyncStatus::new(ActivityLevel::Connecting),
            SyncStatus::new(ActivityLevel::Busy),
            SyncStatus::new(ActivityLevel::Idle),
        ]);

        coordinator.start().unwrap();
        coordinator
            .await_state(ActivityLevel::Idle, Duration::from_secs(5))
            .unwrap();
        assert!(coordinator.is_active());
        assert_eq!(session.start_calls(), 2);
    }

    #[test]
    fn retry_policy_gives_up_after_max_attempts() {
        let session = session(true);
        let policy = StopPolicy::Retry(
            RetryConfig::new(2)
                .with_initial_delay(Duration::from_millis(5))
                .with_jitter(false),
        );
        let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, policy);

        for _ in 0..3 {
            session.push_start_script(vec![
                SyncStatus::new(ActivityLevel::Connecting),
                SyncStatus::with_error(ActivityLevel::Stopped, "connection reset by peer"),
            ]);
        }

        coordinator.start().unwrap();
        // Initial start plus two restarts, then the coordinator gives up.
        assert!(wait_until(|| session.start_calls() == 3, Duration::from_secs(5)));
        assert!(wait_until(|| !coordinator.is_active(), Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(session.start_calls(), 3);
    }

    #[test]
    fn quiescent_observer_fires_on_idle_and_stopped() {
        let session = session(true);
        let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, StopPolicy::Halt);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        coordinator.set_quiescent_observer(Box::new(move |level| {
            sink.lock().push(level);
        }));

        coordinator.start().unwrap();
        session.emit(SyncStatus::new(ActivityLevel::Connecting));
        session.emit(SyncStatus::new(ActivityLevel::Busy));
        session.emit(SyncStatus::new(ActivityLevel::Idle));
        coordinator.stop().unwrap();
        session.emit(SyncStatus::new(ActivityLevel::Stopped));

        assert!(wait_until(|| seen.lock().len() == 2, Duration::from_secs(2)));
        assert_eq!(
            *seen.lock(),
            vec![ActivityLevel::Idle, ActivityLevel::Stopped]
        );
    }

    fn arb_level() -> impl Strategy<Value = ActivityLevel> {
        prop_oneof![
            Just(ActivityLevel::Stopped),
            Just(ActivityLevel::Offline),
            Just(ActivityLevel::Connecting),
            Just(ActivityLevel::Idle),
            Just(ActivityLevel::Busy),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// For every event sequence, `is_active` is false iff the most
        /// recently delivered level is `Stopped`.
        #[test]
        fn activity_tracks_the_last_delivered_event(levels in prop::collection::vec(arb_level(), 1..12)) {
            let session = session(false);
            let coordinator = Coordinator::new(Arc::clone(&session) as Arc<dyn SyncSession>, StopPolicy::Halt);
            coordinator.start().unwrap();

            for level in &levels {
                session.emit(SyncStatus::new(*level));
            }
            let last = *levels.last().unwrap();
            // Marker event: same level, distinguishable error. Once it is
            // the cached status, every earlier event has been applied.
            session.emit(SyncStatus::with_error(last, "drain-marker"));

            prop_assert!(wait_until(
                || coordinator.status().last_error.as_deref() == Some("drain-marker"),
                Duration::from_secs(5)
            ));
            prop_assert_eq!(coordinator.status().activity, last);
            prop_assert_eq!(coordinator.is_active(), last != ActivityLevel::Stopped);
        }
    }
}
