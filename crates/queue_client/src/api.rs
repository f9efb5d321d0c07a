//! Typed collaborator operations.
//!
//! The traits are the seam the session manager and the synchronizers depend
//! on; [`HttpApi`] is the production implementation over [`Transport`].

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{
    DisplaySnapshot, EntryId, LoginRequest, LoginResponse, NewPatient, Priority, PriorityUpdate,
    QueueEntry, QueueSnapshot, UserProfile,
};
use crate::transport::{decode, Transport};

/// Path segments of the login call, exempt from session expiry handling
pub const LOGIN_PATH: &[&str] = &["login"];

/// Authentication operations
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /login`
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError>;

    /// `POST /logout`
    async fn logout(&self) -> Result<(), ApiError>;

    /// `GET /user`
    async fn current_user(&self) -> Result<UserProfile, ApiError>;
}

/// Queue read and command operations
#[async_trait]
pub trait QueueApi: Send + Sync {
    /// `GET /queue/current`
    async fn current_queue(&self) -> Result<QueueSnapshot, ApiError>;

    /// `GET /queue/display`
    async fn display(&self) -> Result<DisplaySnapshot, ApiError>;

    /// `POST /queue/add`
    async fn add_patient(&self, patient: &NewPatient) -> Result<Option<QueueEntry>, ApiError>;

    /// `PUT /queue/{id}/call`
    async fn call_patient(&self, id: &EntryId) -> Result<Option<QueueEntry>, ApiError>;

    /// `PUT /queue/{id}/complete`
    async fn complete_patient(&self, id: &EntryId) -> Result<Option<QueueEntry>, ApiError>;

    /// `PUT /queue/{id}/priority`
    async fn update_priority(
        &self,
        id: &EntryId,
        priority: Priority,
    ) -> Result<Option<QueueEntry>, ApiError>;

    /// `DELETE /queue/{id}`
    async fn remove_patient(&self, id: &EntryId) -> Result<(), ApiError>;
}

/// Profile replies come either bare or wrapped in `{"user": ...}`
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileBody {
    Wrapped { user: UserProfile },
    Bare(UserProfile),
}

/// HTTP implementation of both APIs
#[derive(Clone)]
pub struct HttpApi {
    transport: Arc<Transport>,
}

impl HttpApi {
    /// Wrap a transport
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Underlying transport
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Decode an entry from a command reply when one was sent
    fn optional_entry(bytes: &[u8]) -> Option<QueueEntry> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        match decode::<QueueEntry>(bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "Command reply carried no entry");
                None
            }
        }
    }
}

#[async_trait]
impl AuthApi for HttpApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let bytes = self
            .transport
            .send(Method::POST, LOGIN_PATH, Some(request))
            .await?;
        decode(&bytes)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.transport
            .send_empty::<()>(Method::POST, &["logout"], None)
            .await
    }

    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let body: ProfileBody = self.transport.get_json(&["user"]).await?;
        Ok(match body {
            ProfileBody::Wrapped { user } => user,
            ProfileBody::Bare(user) => user,
        })
    }
}

#[async_trait]
impl QueueApi for HttpApi {
    async fn current_queue(&self) -> Result<QueueSnapshot, ApiError> {
        self.transport.get_json(&["queue", "current"]).await
    }

    async fn display(&self) -> Result<DisplaySnapshot, ApiError> {
        self.transport.get_json(&["queue", "display"]).await
    }

    async fn add_patient(&self, patient: &NewPatient) -> Result<Option<QueueEntry>, ApiError> {
        let bytes = self
            .transport
            .send(Method::POST, &["queue", "add"], Some(patient))
            .await?;
        Ok(Self::optional_entry(&bytes))
    }

    async fn call_patient(&self, id: &EntryId) -> Result<Option<QueueEntry>, ApiError> {
        let bytes = self
            .transport
            .send::<()>(Method::PUT, &["queue", id.as_str(), "call"], None)
            .await?;
        Ok(Self::optional_entry(&bytes))
    }

    async fn complete_patient(&self, id: &EntryId) -> Result<Option<QueueEntry>, ApiError> {
        let bytes = self
            .transport
            .send::<()>(Method::PUT, &["queue", id.as_str(), "complete"], None)
            .await?;
        Ok(Self::optional_entry(&bytes))
    }

    async fn update_priority(
        &self,
        id: &EntryId,
        priority: Priority,
    ) -> Result<Option<QueueEntry>, ApiError> {
        let bytes = self
            .transport
            .send(
                Method::PUT,
                &["queue", id.as_str(), "priority"],
                Some(&PriorityUpdate { priority }),
            )
            .await?;
        Ok(Self::optional_entry(&bytes))
    }

    async fn remove_patient(&self, id: &EntryId) -> Result<(), ApiError> {
        self.transport
            .send_empty::<()>(Method::DELETE, &["queue", id.as_str()], None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_entry_handles_empty_and_foreign_bodies() {
        assert!(HttpApi::optional_entry(b"").is_none());
        assert!(HttpApi::optional_entry(b"  \n").is_none());
        assert!(HttpApi::optional_entry(br#"{"message":"ok"}"#).is_none());
    }

    #[test]
    fn test_optional_entry_decodes_entry() {
        let body = br#"{"id":7,"queue_number":12,"patient_name":"Ann","status":"waiting"}"#;
        let entry = HttpApi::optional_entry(body).unwrap();
        assert_eq!(entry.id, EntryId::new("7"));
        assert_eq!(entry.priority, Priority::Normal);
    }

    #[test]
    fn test_profile_body_shapes() {
        let wrapped: ProfileBody =
            serde_json::from_str(r#"{"user":{"name":"Jane","email":"j@x"}}"#).unwrap();
        assert!(matches!(wrapped, ProfileBody::Wrapped { .. }));

        let bare: ProfileBody = serde_json::from_str(r#"{"name":"Jane"}"#).unwrap();
        assert!(matches!(bare, ProfileBody::Bare(_)));
    }
}
