//! In-process mock of the queue service.
//!
//! Every request is recorded; replies are looked up by method and path
//! (relative to `/api`) and default to 404.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use queue_client::config::ClientConfig;

/// A request as the mock saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// Canned reply
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    body: Option<Value>,
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match self.body {
            Some(body) => (status, Json(body)).into_response(),
            None => status.into_response(),
        }
    }
}

#[derive(Default)]
struct Inner {
    replies: HashMap<(String, String), Reply>,
    requests: Vec<Recorded>,
}

/// Handle to a running mock service
#[derive(Clone, Default)]
pub struct MockService {
    inner: Arc<Mutex<Inner>>,
    base_url: String,
}

impl MockService {
    /// Bind to an ephemeral port and serve in the background
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mock = Self {
            inner: Arc::default(),
            base_url: format!("http://{addr}/api"),
        };

        let app = Router::new().fallback(handle).with_state(mock.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        mock
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client configuration pointed at this mock, with a timer too slow to
    /// fire during a test
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            poll_interval_ms: 60_000,
            request_timeout_ms: 2_000,
            ..ClientConfig::default()
        }
    }

    pub fn on(&self, method: &str, path: &str, reply: Reply) {
        self.inner
            .lock()
            .unwrap()
            .replies
            .insert((method.to_string(), path.to_string()), reply);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests_to(method, path).len()
    }
}

async fn handle(
    State(mock): State<MockService>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path()
        .strip_prefix("/api")
        .unwrap_or(uri.path())
        .to_string();
    let recorded = Recorded {
        method: method.to_string(),
        path: path.clone(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    };

    let reply = {
        let mut inner = mock.inner.lock().unwrap();
        inner.requests.push(recorded);
        inner.replies.get(&(method.to_string(), path)).cloned()
    };

    match reply {
        Some(reply) => reply.into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "Not found"}))).into_response(),
    }
}

/// Base URL of a port nothing listens on
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api")
}

/// Client configuration for an unreachable service
pub async fn unreachable_config() -> ClientConfig {
    ClientConfig {
        base_url: unreachable_base_url().await,
        poll_interval_ms: 60_000,
        request_timeout_ms: Duration::from_secs(2).as_millis() as u64,
        ..ClientConfig::default()
    }
}

/// The queue payload used across tests
pub fn queue_payload() -> Value {
    json!({
        "waiting_count": 2,
        "in_consultation": 1,
        "completed_today": 4,
        "current_number": 11,
        "queue": [
            {
                "id": 7,
                "queue_number": 12,
                "patient_name": "John Doe",
                "patient_age": 35,
                "patient_phone": "555-0100",
                "complaint": "Headache",
                "priority": "normal",
                "status": "waiting"
            },
            {
                "id": 8,
                "queue_number": 11,
                "patient_name": "Mary Major",
                "patient_age": null,
                "complaint": null,
                "priority": "emergency",
                "status": "in_consultation"
            }
        ]
    })
}

/// Login reply for `token`
pub fn login_payload(token: &str) -> Value {
    json!({
        "token": token,
        "user": {"name": "Dr Jane Smith", "email": "jane@clinic.test"}
    })
}
