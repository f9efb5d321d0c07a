//! Session lifecycle: credential storage, request attachment and forced
//! invalidation.
//!
//! [`SessionState`] is the single owner of the live [`Credential`]. The
//! transport reaches it only through [`SessionHooks`]; login and logout go
//! through [`SessionManager`]. Set and clear always replace the token and
//! profile together under one write lock.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, StatusCode};
use std::sync::{Arc, PoisonError, RwLock};

use crate::api::{AuthApi, LOGIN_PATH};
use crate::error::{ApiError, AuthError, StorageError};
use crate::models::{Credential, LoginRequest, UserProfile};
use crate::navigation::{Navigator, Route};
use crate::storage::CredentialStore;
use crate::transport::{RequestHook, ResponseContext, ResponseHook};

/// Shared session accessor and mutator
pub struct SessionState {
    credential: RwLock<Option<Credential>>,
    store: Arc<dyn CredentialStore>,
    navigator: Navigator,
}

impl SessionState {
    /// Create an empty session over `store`
    pub fn new(store: Arc<dyn CredentialStore>, navigator: Navigator) -> Self {
        Self {
            credential: RwLock::new(None),
            store,
            navigator,
        }
    }

    /// Load the persisted credential. Returns whether one was found.
    pub fn restore(&self) -> Result<bool, StorageError> {
        let mut slot = self.credential.write().unwrap_or_else(PoisonError::into_inner);
        let loaded = self.store.load()?;
        let found = loaded.is_some();
        *slot = loaded;
        Ok(found)
    }

    /// Snapshot of the live credential
    pub fn credential(&self) -> Option<Credential> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bearer token of the live credential
    pub fn token(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.token.clone())
    }

    /// Profile of the live credential
    pub fn profile(&self) -> Option<UserProfile> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.user.clone())
    }

    /// Whether a credential is present (not whether it is still valid)
    pub fn is_authenticated(&self) -> bool {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Persist then install `credential`. On storage failure nothing changes.
    pub fn establish(&self, credential: Credential) -> Result<(), StorageError> {
        let mut slot = self.credential.write().unwrap_or_else(PoisonError::into_inner);
        self.store.save(&credential)?;
        *slot = Some(credential);
        Ok(())
    }

    /// Drop the credential from memory and storage
    pub fn clear(&self) {
        let mut slot = self.credential.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear stored session");
        }
    }

    /// Clear the credential and force navigation to the login surface
    pub fn invalidate(&self) {
        self.clear();
        self.navigator.navigate(Route::Login);
    }

    /// Route handle shared with the front-end
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }
}

/// Transport hooks bound to the shared session
pub struct SessionHooks {
    state: Arc<SessionState>,
}

impl SessionHooks {
    /// Bind hooks to `state`
    pub fn new(state: Arc<SessionState>) -> Self {
        Self { state }
    }
}

impl RequestHook for SessionHooks {
    fn on_request(&self, request: &mut Request) {
        let Some(token) = self.state.token() else {
            return;
        };
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Stored token is not a valid header value; sending without it"),
        }
    }
}

impl ResponseHook for SessionHooks {
    fn on_response(&self, context: &ResponseContext<'_>) {
        if context.status != StatusCode::UNAUTHORIZED || context.is_path(LOGIN_PATH) {
            return;
        }
        tracing::warn!(
            method = %context.method,
            path = %context.segments.join("/"),
            "Authorization rejected; clearing session"
        );
        self.state.invalidate();
    }
}

/// Login, logout and profile lookup
pub struct SessionManager {
    state: Arc<SessionState>,
    api: Arc<dyn AuthApi>,
}

impl SessionManager {
    /// Create a manager over shared state and the auth API
    pub fn new(state: Arc<SessionState>, api: Arc<dyn AuthApi>) -> Self {
        Self { state, api }
    }

    /// Shared state
    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// The live credential, if any
    pub fn credential(&self) -> Option<Credential> {
        self.state.credential()
    }

    /// Whether a credential is present
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Profile of the signed-in user
    pub fn profile(&self) -> Option<UserProfile> {
        self.state.profile()
    }

    /// Exchange credentials for a session. Nothing is persisted on failure
    /// and navigation is left alone.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Credential, AuthError> {
        let request = LoginRequest {
            email: identifier.to_string(),
            password: secret.to_string(),
        };

        let response = match self.api.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(error = %e, "Login failed");
                return Err(AuthError::from_api(e));
            }
        };

        if response.token.is_empty() {
            return Err(AuthError::InvalidResponse("empty token".to_string()));
        }

        let credential = Credential {
            token: response.token,
            user: response.user,
        };
        self.state.establish(credential.clone())?;
        tracing::info!(user = credential.user.display_name(), "Signed in");
        Ok(credential)
    }

    /// End the session. The local credential is always cleared, whatever
    /// the collaborator answers.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::warn!(error = %e, "Remote logout failed");
        }
        self.state.invalidate();
        tracing::info!("Signed out");
    }

    /// Fetch the current profile from the collaborator
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.api.current_user().await
    }
}
