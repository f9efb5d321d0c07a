//! Error types for the queue client.
//!
//! The taxonomy follows how each failure is recovered:
//! - [`AuthError`]: login failures, reported inline on the login surface
//! - [`ApiError::Unauthorized`]: expired authorization, recovered globally
//!   by clearing the session
//! - [`CommandError`]: failed mutations, reported to the user
//! - [`FetchError`]: failed polling reads, logged and swallowed

use thiserror::Error;

use crate::config::ConfigError;

/// Transport-level failure of a single collaborator call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The collaborator answered 401; the session has already been cleared.
    #[error("authorization expired")]
    Unauthorized,

    /// The collaborator answered with a non-success status.
    #[error("request failed with status code {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message extracted from a `{"message": ...}` body, if any
        message: Option<String>,
    },

    /// The collaborator could not be reached.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The request URL could not be formed from the base address.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Create a status error
    pub fn status(status: u16, message: Option<String>) -> Self {
        Self::Status { status, message }
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether this failure means the credential is no longer accepted.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// The collaborator's own message, when it sent one.
    pub fn collaborator_message(&self) -> Option<&str> {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Login failure. Nothing is persisted when this is returned.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The collaborator refused the credentials.
    #[error("{message}")]
    Rejected {
        /// Collaborator message or a generic fallback
        message: String,
    },

    /// The collaborator could not be reached.
    #[error("unable to reach the queue service: {reason}")]
    Unreachable {
        /// Transport failure description
        reason: String,
    },

    /// The collaborator accepted the login but the reply was unusable.
    #[error("invalid login response: {0}")]
    InvalidResponse(String),

    /// The credential could not be written to durable storage.
    #[error("failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    pub(crate) fn from_api(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => Self::Rejected {
                message: "Invalid credentials".to_string(),
            },
            ApiError::Status { status, message } => Self::Rejected {
                message: message
                    .unwrap_or_else(|| format!("Login failed with status code {status}")),
            },
            ApiError::Network(e) => Self::Unreachable {
                reason: e.to_string(),
            },
            ApiError::Decode(msg) => Self::InvalidResponse(msg),
            ApiError::InvalidUrl(msg) => Self::Unreachable { reason: msg },
        }
    }
}

/// Queue mutation commands issued from the staff view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `POST /queue/add`
    AddPatient,
    /// `PUT /queue/{id}/call`
    CallPatient,
    /// `PUT /queue/{id}/complete`
    CompletePatient,
    /// `PUT /queue/{id}/priority`
    UpdatePriority,
    /// `DELETE /queue/{id}`
    RemovePatient,
}

impl CommandKind {
    /// Verb used in user-facing error messages
    pub fn verb(&self) -> &'static str {
        match self {
            Self::AddPatient => "adding",
            Self::CallPatient => "calling",
            Self::CompletePatient => "completing",
            Self::UpdatePriority => "updating priority for",
            Self::RemovePatient => "removing",
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddPatient => "add_patient",
            Self::CallPatient => "call_patient",
            Self::CompletePatient => "complete_patient",
            Self::UpdatePriority => "update_priority",
            Self::RemovePatient => "remove_patient",
        }
    }
}

/// A mutation command failed. The prior snapshot stays displayed.
#[derive(Debug, Error)]
#[error("error {} patient: {cause}", kind.verb())]
pub struct CommandError {
    /// Which command failed
    pub kind: CommandKind,
    /// Underlying transport failure
    #[source]
    pub cause: ApiError,
}

impl CommandError {
    /// Create a command error
    pub fn new(kind: CommandKind, cause: ApiError) -> Self {
        Self { kind, cause }
    }

    /// Whether the failure was an expired authorization.
    pub fn is_authorization_expired(&self) -> bool {
        self.cause.is_unauthorized()
    }

    /// Message to show the user, or `None` when the failure is handled by
    /// the global session-expiry redirect instead.
    pub fn user_message(&self) -> Option<String> {
        if self.is_authorization_expired() {
            return None;
        }
        let detail = match self.cause.collaborator_message() {
            Some(message) => message.to_string(),
            None => self.cause.to_string(),
        };
        Some(format!("Error {} patient: {}", self.kind.verb(), detail))
    }
}

/// A polling fetch failed. Logged, never surfaced.
#[derive(Debug, Error)]
#[error("fetch of {resource} failed: {cause}")]
pub struct FetchError {
    /// Which resource was being fetched
    pub resource: &'static str,
    /// Underlying transport failure
    #[source]
    pub cause: ApiError,
}

/// Durable credential storage failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record could not be (de)serialised
    #[error("storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Umbrella error for the client crate.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport error
    #[error("API communication error: {0}")]
    Api(#[from] ApiError),

    /// Login error
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Command error
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
