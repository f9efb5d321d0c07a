//! Staff Synchronizer Integration Tests
//!
//! Commands, re-fetches and failure handling against the mock queue service.

mod common;

use common::{queue_payload, unreachable_config, MockService, Reply};
use queue_client::client::QueueClient;
use queue_client::dashboard::{RowAction, EMPTY_QUEUE_MESSAGE};
use queue_client::models::{EntryId, NewPatient, Priority, UserProfile};
use queue_client::navigation::Route;
use queue_client::storage::MemoryStore;
use queue_client::synchronizer::REMOVAL_PROMPT;
use serde_json::json;
use std::sync::Arc;

fn signed_in_client(mock: &MockService) -> QueueClient {
    let store = Arc::new(MemoryStore::with_entries(
        Some("token-abc"),
        Some(UserProfile::default()),
    ));
    QueueClient::with_store(mock.config(), store, Route::Staff).unwrap()
}

/// Mounting renders the service payload as sent
#[tokio::test]
async fn test_mount_renders_snapshot() {
    let mock = MockService::start().await;
    mock.on("GET", "/queue/current", Reply::json(queue_payload()));
    let client = signed_in_client(&mock);

    let staff = client.mount_staff().await;
    let view = staff.view();

    assert_eq!(view.waiting, 2);
    assert_eq!(view.in_consultation, 1);
    assert_eq!(view.completed_today, 4);
    assert_eq!(view.current, "11");
    assert_eq!(view.rows.len(), 2);

    let first = &view.rows[0];
    assert_eq!(first.number, "#12");
    assert_eq!(first.age.as_deref(), Some("Age: 35"));
    assert_eq!(first.complaint, "Headache");
    assert_eq!(first.actions, vec![RowAction::Call, RowAction::Remove]);

    let second = &view.rows[1];
    assert_eq!(second.age, None);
    assert_eq!(second.complaint, "-");
    assert_eq!(second.status, "in consultation");
    assert_eq!(second.priority, Priority::Emergency);
    assert_eq!(second.actions, vec![RowAction::Complete, RowAction::Remove]);

    assert_eq!(mock.count("GET", "/queue/current"), 1);
}

/// An odd entry neither hides the counters nor the well-formed rows
#[tokio::test]
async fn test_odd_entry_keeps_rest_of_snapshot() {
    let mock = MockService::start().await;
    mock.on(
        "GET",
        "/queue/current",
        Reply::json(json!({
            "waiting_count": 3,
            "in_consultation": 0,
            "completed_today": 1,
            "current_number": null,
            "queue": [
                {"id": 1, "queue_number": 1, "patient_name": "John Doe", "priority": "normal", "status": "waiting"},
                {"id": 2, "queue_number": "A002", "patient_name": "Mary Major", "priority": "urgent", "status": "on_hold"},
                {"id": 3, "queue_number": 3, "patient_name": "Bad Priority", "priority": "critical", "status": "waiting"}
            ]
        })),
    );
    let client = signed_in_client(&mock);

    let staff = client.mount_staff().await;
    let view = staff.view();

    assert_eq!(view.waiting, 3);
    assert_eq!(view.completed_today, 1);
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.rows[0].number, "#1");
    assert_eq!(view.rows[1].number, "#A002");
    assert_eq!(view.rows[1].status, "unknown");
    assert_eq!(view.rows[1].actions, vec![RowAction::Remove]);
}

/// Adding a patient sends the form as entered and re-fetches exactly once
#[tokio::test]
async fn test_add_patient_sends_payload_and_refetches() {
    let mock = MockService::start().await;
    mock.on("GET", "/queue/current", Reply::json(queue_payload()));
    mock.on(
        "POST",
        "/queue/add",
        Reply::status(
            201,
            json!({
                "id": 9,
                "queue_number": 13,
                "patient_name": "Jane Smith",
                "patient_age": "28",
                "priority": "urgent",
                "status": "waiting"
            }),
        ),
    );
    let client = signed_in_client(&mock);
    let staff = client.mount_staff().await;

    let created = staff
        .add_patient(&NewPatient {
            name: "Jane Smith".to_string(),
            age: "28".to_string(),
            phone: "555-1234".to_string(),
            complaint: "Fever".to_string(),
            priority: Priority::Urgent,
        })
        .await
        .unwrap();
    assert_eq!(created.unwrap().queue_number, "13");

    let add = &mock.requests_to("POST", "/queue/add")[0];
    assert_eq!(
        add.body,
        Some(json!({
            "name": "Jane Smith",
            "age": "28",
            "phone": "555-1234",
            "complaint": "Fever",
            "priority": "urgent"
        }))
    );
    assert_eq!(add.authorization.as_deref(), Some("Bearer token-abc"));
    assert_eq!(mock.count("GET", "/queue/current"), 2);
}

/// A rejected add reports the service's message and keeps the snapshot
#[tokio::test]
async fn test_add_patient_failure_reports_message() {
    let mock = MockService::start().await;
    mock.on("GET", "/queue/current", Reply::json(queue_payload()));
    mock.on(
        "POST",
        "/queue/add",
        Reply::status(422, json!({"message": "Name is required"})),
    );
    let client = signed_in_client(&mock);
    let staff = client.mount_staff().await;
    let before = staff.snapshot();

    let err = staff.add_patient(&NewPatient::default()).await.unwrap_err();

    assert_eq!(
        err.user_message().as_deref(),
        Some("Error adding patient: Name is required")
    );
    assert_eq!(staff.snapshot(), before);
    assert_eq!(mock.count("GET", "/queue/current"), 1);
    assert!(client.session().is_authenticated());
}

/// A failure without a message falls back to a generic one
#[tokio::test]
async fn test_call_failure_without_message() {
    let mock = MockService::start().await;
    mock.on("GET", "/queue/current", Reply::json(queue_payload()));
    mock.on("PUT", "/queue/7/call", Reply::empty(500));
    let client = signed_in_client(&mock);
    let staff = client.mount_staff().await;

    let err = staff.call_patient(&EntryId::new("7")).await.unwrap_err();
    let message = err.user_message().unwrap();
    assert!(message.starts_with("Error calling patient: "));
    assert!(message.contains("500"));
}

/// Priority changes go out as-is and trigger a re-fetch
#[tokio::test]
async fn test_update_priority_refetches() {
    let mock = MockService::start().await;
    mock.on("GET", "/queue/current", Reply::json(queue_payload()));
    mock.on("PUT", "/queue/7/priority", Reply::empty(204));
    let client = signed_in_client(&mock);
    let staff = client.mount_staff().await;

    let updated = staff
        .update_priority(&EntryId::new("7"), Priority::Urgent)
        .await
        .unwrap();
    assert!(updated.is_none());

    let put = &mock.requests_to("PUT", "/queue/7/priority")[0];
    assert_eq!(put.body, Some(json!({"priority": "urgent"})));
    assert_eq!(mock.count("GET", "/queue/current"), 2);
}

/// Completing a consultation hits the complete endpoint
#[tokio::test]
async fn test_complete_patient() {
    let mock = MockService::start().await;
    mock.on("GET", "/queue/current", Reply::json(queue_payload()));
    mock.on(
        "PUT",
        "/queue/8/complete",
        Reply::json(json!({"message": "Patient completed"})),
    );
    let client = signed_in_client(&mock);
    let staff = client.mount_staff().await;

    staff.complete_patient(&EntryId::new("8")).await.unwrap();
    assert_eq!(mock.count("PUT", "/queue/8/complete"), 1);
    assert_eq!(mock.count("GET", "/queue/current"), 2);
}

/// Removal is only sent once confirmed
#[tokio::test]
async fn test_removal_requires_confirmation() {
    let mock = MockService::start().await;
    mock.on("GET", "/queue/current", Reply::json(queue_payload()));
    mock.on("DELETE", "/queue/7", Reply::json(json!({"message": "Removed"})));
    let client = signed_in_client(&mock);
    let staff = client.mount_staff().await;

    let request = staff.request_removal(EntryId::new("7"));
    assert_eq!(request.prompt(), REMOVAL_PROMPT);
    request.cancel();
    assert_eq!(mock.count("DELETE", "/queue/7"), 0);
    assert_eq!(mock.count("GET", "/queue/current"), 1);

    staff
        .request_removal(EntryId::new("7"))
        .confirm()
        .await
        .unwrap();
    assert_eq!(mock.count("DELETE", "/queue/7"), 1);
    assert_eq!(mock.count("GET", "/queue/current"), 2);
}

/// An unreachable service leaves a zeroed view with the empty-queue row
#[tokio::test]
async fn test_network_failure_renders_placeholders() {
    let client = QueueClient::with_store(
        unreachable_config().await,
        Arc::new(MemoryStore::with_entries(
            Some("token-abc"),
            Some(UserProfile::default()),
        )),
        Route::Staff,
    )
    .unwrap();

    let staff = client.mount_staff().await;
    let view = staff.view();

    assert_eq!(view.waiting, 0);
    assert_eq!(view.in_consultation, 0);
    assert_eq!(view.completed_today, 0);
    assert_eq!(view.current, "---");
    assert!(view.rows.is_empty());
    assert_eq!(view.empty_message(), Some(EMPTY_QUEUE_MESSAGE));
    // Transport failures never expire the session
    assert!(client.session().is_authenticated());
}

/// Identifiers are percent-encoded into the path
#[tokio::test]
async fn test_string_identifier_in_path() {
    let mock = MockService::start().await;
    mock.on("GET", "/queue/current", Reply::json(json!({"queue": []})));
    mock.on("PUT", "/queue/abc-123/call", Reply::empty(200));
    let client = signed_in_client(&mock);
    let staff = client.mount_staff().await;

    staff.call_patient(&EntryId::new("abc-123")).await.unwrap();
    assert_eq!(mock.count("PUT", "/queue/abc-123/call"), 1);
}
