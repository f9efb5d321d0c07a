//! Public waiting-room display.
//!
//! [`DisplayProjector`] polls `GET /queue/display` on the same timer model as
//! the staff view but has no command path and needs no session.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::api::QueueApi;
use crate::error::FetchError;
use crate::models::{DisplaySnapshot, Priority};
use crate::poller::{self, Activity, Lifecycle, Mounted, PolledView, SnapshotCell, SyncPhase};
use crate::synchronizer::SyncOptions;

/// Shown in place of an absent current number
pub const NO_CURRENT_NUMBER: &str = "---";

/// Shown instead of an empty upcoming grid
pub const NO_PATIENTS_WAITING: &str = "No patients waiting";

/// Shown when the service sent no update time
pub const NO_UPDATE_TIME: &str = "—";

/// Current number, or the placeholder when nobody is being served
pub fn current_number_label(number: Option<&str>) -> String {
    match number.map(str::trim) {
        Some(n) if !n.is_empty() && n != "0" => n.to_string(),
        _ => NO_CURRENT_NUMBER.to_string(),
    }
}

/// `1 person waiting`, otherwise `N people waiting`
pub fn waiting_label(count: u64) -> String {
    if count == 1 {
        "1 person waiting".to_string()
    } else {
        format!("{count} people waiting")
    }
}

/// Service timestamp as local `HH:MM:SS`
pub fn updated_label(updated_at: Option<&str>) -> String {
    let Some(raw) = updated_at.filter(|s| !s.is_empty()) else {
        return NO_UPDATE_TIME.to_string();
    };
    match parse_timestamp(raw) {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => {
            tracing::debug!(updated_at = raw, "Unrecognised update timestamp");
            NO_UPDATE_TIME.to_string()
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Local));
    }
    // Zone-less timestamps are taken as local time
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

/// One upcoming ticket tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingTile {
    /// Ticket number
    pub number: String,
    /// Priority tag
    pub priority: Priority,
}

/// The upcoming section of the display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upcoming {
    /// Nobody is queued behind the current number
    NoneWaiting,
    /// Tiles in service order
    Tiles(Vec<UpcomingTile>),
}

/// Everything the public display renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayView {
    /// Number being served, or `---`
    pub current: String,
    /// Pluralised waiting count
    pub waiting: String,
    /// Upcoming numbers
    pub upcoming: Upcoming,
    /// Last update time
    pub updated: String,
}

impl DisplayView {
    /// Project a display snapshot
    pub fn from_snapshot(snapshot: &DisplaySnapshot) -> Self {
        let upcoming = if snapshot.next_numbers.is_empty() {
            Upcoming::NoneWaiting
        } else {
            Upcoming::Tiles(
                snapshot
                    .next_numbers
                    .iter()
                    .map(|next| UpcomingTile {
                        number: next.number.clone(),
                        priority: next.priority,
                    })
                    .collect(),
            )
        };

        Self {
            current: current_number_label(snapshot.current_number.as_deref()),
            waiting: waiting_label(snapshot.waiting_count),
            upcoming,
            updated: updated_label(snapshot.updated_at.as_deref()),
        }
    }
}

impl Default for DisplayView {
    fn default() -> Self {
        Self::from_snapshot(&DisplaySnapshot::default())
    }
}

/// Read-only poller for the public display
pub struct DisplayProjector {
    api: Arc<dyn QueueApi>,
    cell: SnapshotCell<DisplaySnapshot>,
    activity: Activity,
    period: Duration,
}

impl DisplayProjector {
    /// Activate: fetch once, then arm the timer
    pub async fn mount(api: Arc<dyn QueueApi>, options: SyncOptions) -> Mounted<Self> {
        let projector = Arc::new(Self {
            api,
            cell: SnapshotCell::new(DisplaySnapshot::default(), options.ordering),
            activity: Activity::default(),
            period: options.poll_interval,
        });
        let _ = projector.refresh().await;
        let handle = poller::arm(Arc::clone(&projector));
        Mounted::new(projector, handle)
    }

    /// Fetch the display now. Returns whether the result was applied.
    pub async fn refresh(&self) -> Result<bool, FetchError> {
        let ticket = self.cell.issue();
        let result = {
            let _fetching = self.activity.fetching();
            self.api.display().await
        };

        match result {
            Ok(snapshot) => Ok(self.cell.apply(ticket, snapshot)),
            Err(cause) => {
                let err = FetchError {
                    resource: "display",
                    cause,
                };
                tracing::warn!(error = %err, "Display fetch failed; keeping last snapshot");
                Err(err)
            }
        }
    }

    /// Latest applied snapshot
    pub fn snapshot(&self) -> DisplaySnapshot {
        self.cell.current()
    }

    /// Observe snapshot replacements
    pub fn subscribe(&self) -> watch::Receiver<DisplaySnapshot> {
        self.cell.subscribe()
    }

    /// Render model of the latest snapshot
    pub fn view(&self) -> DisplayView {
        DisplayView::from_snapshot(&self.snapshot())
    }

    /// Current sync state
    pub fn phase(&self) -> SyncPhase {
        self.activity.phase()
    }
}

#[async_trait]
impl PolledView for DisplayProjector {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpcomingNumber;
    use chrono::Utc;

    #[test]
    fn test_waiting_label_pluralises() {
        assert_eq!(waiting_label(0), "0 people waiting");
        assert_eq!(waiting_label(1), "1 person waiting");
        assert_eq!(waiting_label(5), "5 people waiting");
    }

    #[test]
    fn test_current_number_placeholder() {
        assert_eq!(current_number_label(None), "---");
        assert_eq!(current_number_label(Some("0")), "---");
        assert_eq!(current_number_label(Some("")), "---");
        assert_eq!(current_number_label(Some("15")), "15");
        assert_eq!(current_number_label(Some("A015")), "A015");
    }

    #[test]
    fn test_empty_display() {
        let view = DisplayView::default();
        assert_eq!(view.current, NO_CURRENT_NUMBER);
        assert_eq!(view.waiting, "0 people waiting");
        assert_eq!(view.upcoming, Upcoming::NoneWaiting);
        assert_eq!(view.updated, NO_UPDATE_TIME);
    }

    #[test]
    fn test_upcoming_tiles_keep_order() {
        let view = DisplayView::from_snapshot(&DisplaySnapshot {
            current_number: Some("15".to_string()),
            next_numbers: vec![
                UpcomingNumber {
                    number: "16".to_string(),
                    priority: Priority::Normal,
                },
                UpcomingNumber {
                    number: "17".to_string(),
                    priority: Priority::Urgent,
                },
            ],
            waiting_count: 5,
            updated_at: None,
        });

        let Upcoming::Tiles(tiles) = view.upcoming else {
            panic!("expected tiles");
        };
        assert_eq!(tiles[0].number, "16");
        assert_eq!(tiles[1].priority, Priority::Urgent);
    }

    #[test]
    fn test_updated_label_uses_local_time() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 5).unwrap();
        let expected = utc.with_timezone(&Local).format("%H:%M:%S").to_string();
        assert_eq!(updated_label(Some("2024-03-01T09:30:05Z")), expected);

        assert_eq!(updated_label(Some("2024-03-01 09:30:05")), "09:30:05");
        assert_eq!(updated_label(Some("yesterday")), NO_UPDATE_TIME);
        assert_eq!(updated_label(None), NO_UPDATE_TIME);
    }
}
