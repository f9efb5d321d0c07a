//! Polling machinery shared by the staff synchronizer and the display
//! projector.
//!
//! A mounted view owns a [`PollHandle`]. Dropping the handle retires the
//! view's [`Lifecycle`]: the timer task stops at its next wake-up and any
//! fetch still in flight completes without touching the snapshot.

use async_trait::async_trait;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::{FetchOrdering, MIN_POLL_INTERVAL_MS};

/// Liveness of one mounted view
#[derive(Debug)]
pub struct Lifecycle {
    alive: AtomicBool,
    shutdown: Notify,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
            shutdown: Notify::new(),
        }
    }

    /// Whether results may still be applied
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop applying results and wake the timer so it exits
    pub fn retire(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            self.shutdown.notify_one();
        }
    }
}

/// Latest snapshot of a view, guarded by the view's lifecycle
pub(crate) struct SnapshotCell<T> {
    tx: watch::Sender<T>,
    lifecycle: Arc<Lifecycle>,
    ordering: FetchOrdering,
    issued: AtomicU64,
    applied: AtomicU64,
}

impl<T: Clone> SnapshotCell<T> {
    pub(crate) fn new(initial: T, ordering: FetchOrdering) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx,
            lifecycle: Arc::new(Lifecycle::new()),
            ordering,
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    pub(crate) fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Stamp a fetch about to be sent
    pub(crate) fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the snapshot with the result of fetch `ticket`.
    ///
    /// Returns `false` when the view is retired, or when issuance ordering
    /// is on and a newer fetch has already been applied.
    pub(crate) fn apply(&self, ticket: u64, value: T) -> bool {
        let lifecycle = &self.lifecycle;
        let ordering = self.ordering;
        let applied = &self.applied;

        // The check runs under the channel's lock so racing appliers serialise.
        self.tx.send_if_modified(move |current| {
            if !lifecycle.is_alive() {
                return false;
            }
            if ordering == FetchOrdering::Issuance && applied.load(Ordering::SeqCst) > ticket {
                return false;
            }
            applied.fetch_max(ticket, Ordering::SeqCst);
            *current = value;
            true
        })
    }

    pub(crate) fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

/// Observable state of a view's sync loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing in flight
    Idle,
    /// A read is in flight
    Fetching,
    /// A user command is in flight
    Mutating,
}

/// In-flight counters behind [`SyncPhase`]
#[derive(Debug, Default)]
pub(crate) struct Activity {
    fetches: AtomicUsize,
    commands: AtomicUsize,
}

impl Activity {
    pub(crate) fn fetching(&self) -> InFlight<'_> {
        InFlight::enter(&self.fetches)
    }

    pub(crate) fn mutating(&self) -> InFlight<'_> {
        InFlight::enter(&self.commands)
    }

    pub(crate) fn phase(&self) -> SyncPhase {
        if self.commands.load(Ordering::SeqCst) > 0 {
            SyncPhase::Mutating
        } else if self.fetches.load(Ordering::SeqCst) > 0 {
            SyncPhase::Fetching
        } else {
            SyncPhase::Idle
        }
    }
}

/// Counter guard, decremented on drop
pub(crate) struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A view that refreshes itself on a timer
#[async_trait]
pub trait PolledView: Send + Sync + 'static {
    /// Fetch once, applying the result if the view is still mounted.
    /// Failures are logged and swallowed.
    async fn poll_once(&self);

    /// The view's lifecycle
    fn lifecycle(&self) -> &Arc<Lifecycle>;

    /// Timer period
    fn period(&self) -> Duration;
}

/// Owner of a view's repeating timer. Dropping it tears the view down.
#[derive(Debug)]
pub struct PollHandle {
    lifecycle: Arc<Lifecycle>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Whether the view is still mounted
    pub fn is_active(&self) -> bool {
        self.lifecycle.is_alive()
    }

    /// Tear down and wait for the timer task to exit. A fetch already in
    /// flight on the timer is allowed to finish first.
    pub async fn deactivate(mut self) {
        self.lifecycle.retire();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.lifecycle.retire();
    }
}

/// Arm the repeating timer for `view`. The first tick fires one period
/// from now; the activation fetch is the caller's job. Periods below
/// [`MIN_POLL_INTERVAL_MS`] are raised to it.
pub(crate) fn arm<V: PolledView>(view: Arc<V>) -> PollHandle {
    let lifecycle = view.lifecycle().clone();
    let floor = Duration::from_millis(MIN_POLL_INTERVAL_MS);
    let period = view.period();
    let period = if period < floor {
        tracing::warn!(
            requested_ms = period.as_millis() as u64,
            used_ms = MIN_POLL_INTERVAL_MS,
            "Poll period too short; clamping"
        );
        floor
    } else {
        period
    };
    let task_lifecycle = lifecycle.clone();

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = task_lifecycle.shutdown.notified() => break,
            }
            if !task_lifecycle.is_alive() {
                break;
            }
            view.poll_once().await;
        }
        tracing::debug!("Poll timer disarmed");
    });

    PollHandle {
        lifecycle,
        task: Some(task),
    }
}

/// A mounted view: the view itself plus the handle keeping it alive
pub struct Mounted<V> {
    view: Arc<V>,
    handle: PollHandle,
}

impl<V> Mounted<V> {
    pub(crate) fn new(view: Arc<V>, handle: PollHandle) -> Self {
        Self { view, handle }
    }

    /// Shared reference to the view, usable from other tasks
    pub fn shared(&self) -> Arc<V> {
        Arc::clone(&self.view)
    }

    /// Whether the view is still mounted
    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    /// Tear the view down and wait for its timer to stop
    pub async fn unmount(self) {
        let Self { handle, .. } = self;
        handle.deactivate().await;
    }
}

impl<V> Deref for Mounted<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.view
    }
}
