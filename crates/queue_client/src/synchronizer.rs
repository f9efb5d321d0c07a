//! Staff-side queue synchronizer.
//!
//! Holds the latest [`QueueSnapshot`], re-fetches it on a fixed timer and
//! after every successful command. Fetch failures keep the last good
//! snapshot; command failures are returned to the caller.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::api::QueueApi;
use crate::config::{ClientConfig, FetchOrdering, DEFAULT_POLL_INTERVAL_MS};
use crate::dashboard::StaffView;
use crate::error::{ApiError, CommandError, CommandKind, FetchError};
use crate::models::{EntryId, NewPatient, Priority, QueueEntry, QueueSnapshot};
use crate::poller::{self, Activity, Lifecycle, Mounted, PolledView, SnapshotCell, SyncPhase};

/// Confirmation prompt shown before a removal is sent
pub const REMOVAL_PROMPT: &str = "Remove this patient from queue?";

/// Polling parameters shared by every mounted view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Timer period
    pub poll_interval: Duration,
    /// How racing fetch results are reconciled
    pub ordering: FetchOrdering,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            ordering: FetchOrdering::default(),
        }
    }
}

impl From<&ClientConfig> for SyncOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            ordering: config.fetch_ordering,
        }
    }
}

/// Staff view synchronizer
pub struct QueueSynchronizer {
    api: Arc<dyn QueueApi>,
    cell: SnapshotCell<QueueSnapshot>,
    activity: Activity,
    period: Duration,
}

impl QueueSynchronizer {
    fn new(api: Arc<dyn QueueApi>, options: SyncOptions) -> Self {
        Self {
            api,
            cell: SnapshotCell::new(QueueSnapshot::default(), options.ordering),
            activity: Activity::default(),
            period: options.poll_interval,
        }
    }

    /// Activate: fetch once, then arm the timer
    pub async fn mount(api: Arc<dyn QueueApi>, options: SyncOptions) -> Mounted<Self> {
        let sync = Arc::new(Self::new(api, options));
        // Failure is already logged; the zeroed snapshot stays until the next tick.
        let _ = sync.refresh().await;
        let handle = poller::arm(Arc::clone(&sync));
        tracing::debug!(period_ms = options.poll_interval.as_millis() as u64, "Queue view mounted");
        Mounted::new(sync, handle)
    }

    /// Fetch the queue now. Returns whether the result was applied.
    pub async fn refresh(&self) -> Result<bool, FetchError> {
        let ticket = self.cell.issue();
        let result = {
            let _fetching = self.activity.fetching();
            self.api.current_queue().await
        };

        match result {
            Ok(snapshot) => {
                let applied = self.cell.apply(ticket, snapshot);
                if !applied {
                    tracing::debug!(ticket, "Discarded queue snapshot");
                }
                Ok(applied)
            }
            Err(cause) => {
                let err = FetchError {
                    resource: "queue",
                    cause,
                };
                tracing::warn!(error = %err, "Queue fetch failed; keeping last snapshot");
                Err(err)
            }
        }
    }

    /// Latest applied snapshot
    pub fn snapshot(&self) -> QueueSnapshot {
        self.cell.current()
    }

    /// Observe snapshot replacements
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.cell.subscribe()
    }

    /// Render model of the latest snapshot
    pub fn view(&self) -> StaffView {
        StaffView::from_snapshot(&self.snapshot())
    }

    /// Current sync state
    pub fn phase(&self) -> SyncPhase {
        self.activity.phase()
    }

    /// `POST /queue/add`
    pub async fn add_patient(
        &self,
        patient: &NewPatient,
    ) -> Result<Option<QueueEntry>, CommandError> {
        self.run_command(CommandKind::AddPatient, self.api.add_patient(patient))
            .await
    }

    /// `PUT /queue/{id}/call`
    pub async fn call_patient(&self, id: &EntryId) -> Result<Option<QueueEntry>, CommandError> {
        self.run_command(CommandKind::CallPatient, self.api.call_patient(id))
            .await
    }

    /// `PUT /queue/{id}/complete`
    pub async fn complete_patient(
        &self,
        id: &EntryId,
    ) -> Result<Option<QueueEntry>, CommandError> {
        self.run_command(CommandKind::CompletePatient, self.api.complete_patient(id))
            .await
    }

    /// `PUT /queue/{id}/priority`
    pub async fn update_priority(
        &self,
        id: &EntryId,
        priority: Priority,
    ) -> Result<Option<QueueEntry>, CommandError> {
        self.run_command(
            CommandKind::UpdatePriority,
            self.api.update_priority(id, priority),
        )
        .await
    }

    /// Start a removal. Nothing is sent until the request is confirmed.
    pub fn request_removal(&self, id: EntryId) -> RemovalRequest<'_> {
        RemovalRequest { sync: self, id }
    }

    async fn run_command<T, F>(&self, kind: CommandKind, call: F) -> Result<T, CommandError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let result = {
            let _mutating = self.activity.mutating();
            call.await
        };

        match result {
            Ok(value) => {
                tracing::info!(command = kind.name(), "Command succeeded");
                if self.cell.lifecycle().is_alive() {
                    let _ = self.refresh().await;
                }
                Ok(value)
            }
            Err(cause) => {
                let err = CommandError::new(kind, cause);
                if err.is_authorization_expired() {
                    tracing::debug!(command = kind.name(), "Command rejected; session expired");
                } else {
                    tracing::warn!(command = kind.name(), error = %err, "Command failed");
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl PolledView for QueueSynchronizer {
    async fn poll_once(&self) {
        let _ = self.refresh().await;
    }

    fn lifecycle(&self) -> &Arc<Lifecycle> {
        self.cell.lifecycle()
    }

    fn period(&self) -> Duration {
        self.period
    }
}

/// A pending removal awaiting confirmation
#[must_use = "a removal is only sent once confirmed"]
pub struct RemovalRequest<'a> {
    sync: &'a QueueSynchronizer,
    id: EntryId,
}

impl RemovalRequest<'_> {
    /// Question to put to the user
    pub fn prompt(&self) -> &'static str {
        REMOVAL_PROMPT
    }

    /// Entry to be removed
    pub fn id(&self) -> &EntryId {
        &self.id
    }

    /// Send `DELETE /queue/{id}`
    pub async fn confirm(self) -> Result<(), CommandError> {
        let Self { sync, id } = self;
        sync.run_command(CommandKind::RemovePatient, sync.api.remove_patient(&id))
            .await
    }

    /// Abandon the removal without contacting the service
    pub fn cancel(self) {
        tracing::debug!(id = %self.id, "Removal cancelled");
    }
}
