//! Staff view model.
//!
//! Pure projection of a [`QueueSnapshot`] into display strings and the
//! actions each row offers. Counters are taken from the snapshot as sent.

use crate::display::current_number_label;
use crate::models::{EntryId, Priority, QueueEntry, QueueSnapshot, Status};

/// Row shown when the queue has no entries
pub const EMPTY_QUEUE_MESSAGE: &str = "No patients in queue";

/// Action a staff member can take on a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    /// Call a waiting patient in
    Call,
    /// Finish a consultation
    Complete,
    /// Remove from the queue (asks for confirmation)
    Remove,
}

impl RowAction {
    /// Button label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Call => "Call",
            Self::Complete => "Complete",
            Self::Remove => "Remove",
        }
    }
}

/// One rendered queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffRow {
    /// Entry identity, for issuing commands
    pub id: EntryId,
    /// `#<queue_number>`
    pub number: String,
    /// Patient name
    pub name: String,
    /// `Age: <age>`, when an age was entered
    pub age: Option<String>,
    /// Complaint, `-` when absent
    pub complaint: String,
    /// Current priority
    pub priority: Priority,
    /// Status label
    pub status: String,
    /// Available actions, in button order
    pub actions: Vec<RowAction>,
}

impl From<&QueueEntry> for StaffRow {
    fn from(entry: &QueueEntry) -> Self {
        let mut actions = Vec::with_capacity(2);
        match entry.status {
            Status::Waiting => actions.push(RowAction::Call),
            Status::InConsultation => actions.push(RowAction::Complete),
            Status::Completed | Status::Removed | Status::Unknown => {}
        }
        actions.push(RowAction::Remove);

        Self {
            id: entry.id.clone(),
            number: format!("#{}", entry.queue_number),
            name: entry.patient_name.clone(),
            age: entry.patient_age.as_ref().map(|age| format!("Age: {age}")),
            complaint: entry.complaint.clone().unwrap_or_else(|| "-".to_string()),
            priority: entry.priority,
            status: entry.status.label(),
            actions,
        }
    }
}

/// Everything the staff screen renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffView {
    /// Patients waiting
    pub waiting: u64,
    /// Patients in consultation
    pub in_consultation: u64,
    /// Visits completed today
    pub completed_today: u64,
    /// Number being served, or the placeholder
    pub current: String,
    /// Queue rows in service order
    pub rows: Vec<StaffRow>,
}

impl StaffView {
    /// Project a snapshot
    pub fn from_snapshot(snapshot: &QueueSnapshot) -> Self {
        Self {
            waiting: snapshot.waiting_count,
            in_consultation: snapshot.in_consultation_count,
            completed_today: snapshot.completed_today,
            current: current_number_label(snapshot.current_number.as_deref()),
            rows: snapshot.entries.iter().map(StaffRow::from).collect(),
        }
    }

    /// Placeholder row text when there is nothing to list
    pub fn empty_message(&self) -> Option<&'static str> {
        self.rows.is_empty().then_some(EMPTY_QUEUE_MESSAGE)
    }

    /// Row for `id`, if listed
    pub fn row(&self, id: &EntryId) -> Option<&StaffRow> {
        self.rows.iter().find(|row| &row.id == id)
    }
}

impl Default for StaffView {
    fn default() -> Self {
        Self::from_snapshot(&QueueSnapshot::default())
    }
}
