//! Wire and domain types exchanged with the queue service.
//!
//! Every value here is a snapshot: the client never patches entries in place,
//! it replaces whole snapshots after each fetch.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Triage priority. Ordered so that `Emergency > Urgent > Normal`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Routine visit
    #[default]
    Normal,
    /// Should be seen soon
    Urgent,
    /// Seen immediately
    Emergency,
}

impl Priority {
    /// All priorities, lowest first
    pub const ALL: [Priority; 3] = [Self::Normal, Self::Urgent, Self::Emergency];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
            Self::Emergency => "emergency",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Urgent => "Urgent",
            Self::Emergency => "Emergency",
        }
    }

    /// Next priority in selector order, wrapping around
    pub fn next(&self) -> Self {
        match self {
            Self::Normal => Self::Urgent,
            Self::Urgent => Self::Emergency,
            Self::Emergency => Self::Normal,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of an entry in the visit lifecycle.
///
/// `Waiting -> InConsultation -> Completed`, with `Removed` reachable from
/// the first two. Transitions are decided by the collaborator only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting to be called
    Waiting,
    /// Currently with a clinician
    InConsultation,
    /// Visit finished
    Completed,
    /// Deleted from the queue
    Removed,
    /// A status this client does not know
    #[serde(other)]
    Unknown,
}

impl Status {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InConsultation => "in_consultation",
            Self::Completed => "completed",
            Self::Removed => "removed",
            Self::Unknown => "unknown",
        }
    }

    /// Human label: the wire name with underscores as spaces
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// Opaque entry identity. The service may send it as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Wrap a raw identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Scalar::deserialize(deserializer).map(|s| Self(s.into_string()))
    }
}

/// Number-or-string JSON scalar.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

fn optional_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(Scalar::into_string)
        .filter(|s| !s.is_empty()))
}

fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn zero_if_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

fn ticket<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(Scalar::into_string)
}

fn serving_ticket<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(optional_scalar(deserializer)?.filter(|s| s != "0"))
}

/// Decode each entry on its own; one malformed entry is skipped, not fatal.
fn lenient_entries<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<QueueEntry>, D::Error> {
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match QueueEntry::deserialize(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable queue entry");
                None
            }
        })
        .collect())
}

/// One patient in the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Opaque identity used in command paths
    pub id: EntryId,
    /// Ticket token shown to the patient; a number or a string on the wire
    #[serde(deserialize_with = "ticket")]
    pub queue_number: String,
    /// Patient name
    #[serde(default, deserialize_with = "text_or_empty")]
    pub patient_name: String,
    /// Age as entered at the desk
    #[serde(default, deserialize_with = "optional_scalar")]
    pub patient_age: Option<String>,
    /// Contact phone
    #[serde(default, deserialize_with = "optional_text")]
    pub patient_phone: Option<String>,
    /// Presenting complaint
    #[serde(default, deserialize_with = "optional_text")]
    pub complaint: Option<String>,
    /// Triage priority
    #[serde(default)]
    pub priority: Priority,
    /// Lifecycle status
    pub status: Status,
}

/// Full staff-facing read of the queue.
///
/// Counters are server-derived and must not be recomputed from `entries`,
/// which may be filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Ordered entries
    #[serde(rename = "queue", default, deserialize_with = "lenient_entries")]
    pub entries: Vec<QueueEntry>,
    /// Patients waiting
    #[serde(default, deserialize_with = "zero_if_null")]
    pub waiting_count: u64,
    /// Patients currently in consultation
    #[serde(
        rename = "in_consultation",
        alias = "in_consultation_count",
        default,
        deserialize_with = "zero_if_null"
    )]
    pub in_consultation_count: u64,
    /// Visits completed today
    #[serde(default, deserialize_with = "zero_if_null")]
    pub completed_today: u64,
    /// Number currently being served
    #[serde(default, deserialize_with = "serving_ticket")]
    pub current_number: Option<String>,
}

/// An upcoming ticket on the public display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingNumber {
    /// Ticket token
    #[serde(deserialize_with = "ticket")]
    pub number: String,
    /// Priority tag
    #[serde(default)]
    pub priority: Priority,
}

/// Public display read, produced independently by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    /// Number currently being served
    #[serde(default, deserialize_with = "serving_ticket")]
    pub current_number: Option<String>,
    /// Short ordered preview of the next numbers
    #[serde(default)]
    pub next_numbers: Vec<UpcomingNumber>,
    /// Total waiting
    #[serde(default, deserialize_with = "zero_if_null")]
    pub waiting_count: u64,
    /// RFC 3339 timestamp of the service-side update
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Add-patient payload. Fields are sent exactly as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    /// Patient name (required by the service)
    pub name: String,
    /// Age as typed
    pub age: String,
    /// Phone
    pub phone: String,
    /// Presenting complaint
    pub complaint: String,
    /// Triage priority
    pub priority: Priority,
}

/// `PUT /queue/{id}/priority` body
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PriorityUpdate {
    /// New priority
    pub priority: Priority,
}

/// Signed-in staff member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Name to show, `"User"` when unnamed
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("User")
    }

    /// First word of the display name, for narrow layouts
    pub fn short_name(&self) -> &str {
        let name = self.display_name();
        name.split_whitespace().next().unwrap_or(name)
    }
}

/// Bearer token plus the profile it was issued for.
///
/// Always stored and cleared as a pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Opaque bearer token
    pub token: String,
    /// Associated profile
    pub user: UserProfile,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// `POST /login` body
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Account identifier
    pub email: String,
    /// Account secret
    pub password: String,
}

/// `POST /login` reply
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Issued bearer token
    pub token: String,
    /// Profile of the signed-in user
    #[serde(default)]
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Emergency > Priority::Urgent);
        assert!(Priority::Urgent > Priority::Normal);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_priority_cycle() {
        assert_eq!(Priority::Normal.next(), Priority::Urgent);
        assert_eq!(Priority::Emergency.next(), Priority::Normal);
    }

    #[test]
    fn test_status_label() {
        assert_eq!(Status::InConsultation.label(), "in consultation");
        assert_eq!(Status::Waiting.label(), "waiting");
    }

    #[test]
    fn test_snapshot_decodes_service_payload() {
        let snapshot: QueueSnapshot = serde_json::from_value(json!({
            "waiting_count": 1,
            "in_consultation": 1,
            "completed_today": 2,
            "current_number": 5,
            "queue": [{
                "id": 1,
                "queue_number": 1,
                "patient_name": "John Doe",
                "patient_age": 35,
                "complaint": "Headache",
                "priority": "normal",
                "status": "waiting"
            }]
        }))
        .unwrap();

        assert_eq!(snapshot.in_consultation_count, 1);
        assert_eq!(snapshot.current_number.as_deref(), Some("5"));
        let entry = &snapshot.entries[0];
        assert_eq!(entry.id, EntryId::new("1"));
        assert_eq!(entry.patient_age.as_deref(), Some("35"));
        assert_eq!(entry.patient_phone, None);
    }

    #[test]
    fn test_malformed_entry_does_not_sink_snapshot() {
        let snapshot: QueueSnapshot = serde_json::from_value(json!({
            "waiting_count": 3,
            "current_number": "A001",
            "queue": [
                {"id": 1, "queue_number": 1, "patient_name": "John Doe", "status": "waiting"},
                {"id": 2, "queue_number": "A002", "patient_name": null, "status": "on_hold"},
                {"id": 3, "patient_name": "No Ticket", "status": "waiting"}
            ]
        }))
        .unwrap();

        assert_eq!(snapshot.waiting_count, 3);
        assert_eq!(snapshot.current_number.as_deref(), Some("A001"));
        assert_eq!(snapshot.entries.len(), 2);
        assert_eq!(snapshot.entries[0].queue_number, "1");
        let odd = &snapshot.entries[1];
        assert_eq!(odd.queue_number, "A002");
        assert_eq!(odd.patient_name, "");
        assert_eq!(odd.status, Status::Unknown);
    }

    #[test]
    fn test_display_tickets_accept_text() {
        let display: DisplaySnapshot = serde_json::from_value(json!({
            "current_number": 0,
            "next_numbers": [{"number": "B7", "priority": "urgent"}, {"number": 8}]
        }))
        .unwrap();

        assert_eq!(display.current_number, None);
        assert_eq!(display.next_numbers[0].number, "B7");
        assert_eq!(display.next_numbers[1].number, "8");
        assert_eq!(display.next_numbers[1].priority, Priority::Normal);
    }

    #[test]
    fn test_snapshot_tolerates_missing_and_null_counters() {
        let snapshot: QueueSnapshot = serde_json::from_value(json!({
            "waiting_count": null,
            "in_consultation_count": 3,
            "current_number": null
        }))
        .unwrap();

        assert_eq!(snapshot.waiting_count, 0);
        assert_eq!(snapshot.in_consultation_count, 3);
        assert_eq!(snapshot.completed_today, 0);
        assert!(snapshot.entries.is_empty());
        assert_eq!(snapshot.current_number, None);
    }

    #[test]
    fn test_new_patient_payload_shape() {
        let patient = NewPatient {
            name: "Jane Smith".to_string(),
            age: "28".to_string(),
            phone: "555-1234".to_string(),
            complaint: "Fever".to_string(),
            priority: Priority::Urgent,
        };
        assert_eq!(
            serde_json::to_value(&patient).unwrap(),
            json!({
                "name": "Jane Smith",
                "age": "28",
                "phone": "555-1234",
                "complaint": "Fever",
                "priority": "urgent"
            })
        );
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential {
            token: "token-123".to_string(),
            user: UserProfile::default(),
        };
        assert!(!format!("{:?}", credential).contains("token-123"));
    }

    #[test]
    fn test_profile_names() {
        let user = UserProfile {
            name: Some("Jane Doe".to_string()),
            email: None,
        };
        assert_eq!(user.display_name(), "Jane Doe");
        assert_eq!(user.short_name(), "Jane");
        assert_eq!(UserProfile::default().display_name(), "User");
    }
}
