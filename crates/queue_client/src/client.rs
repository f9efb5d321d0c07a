//! Client facade wiring session, transports and views together.

use std::sync::Arc;

use crate::api::{HttpApi, QueueApi};
use crate::config::ClientConfig;
use crate::display::DisplayProjector;
use crate::error::ClientError;
use crate::gate::AccessGate;
use crate::navigation::{Navigator, Route};
use crate::poller::Mounted;
use crate::session::{SessionHooks, SessionManager, SessionState};
use crate::storage::{CredentialStore, FileStore};
use crate::synchronizer::{QueueSynchronizer, SyncOptions};
use crate::transport::Transport;

/// Entry point for front-ends
pub struct QueueClient {
    config: ClientConfig,
    session: SessionManager,
    gate: AccessGate,
    api: Arc<HttpApi>,
}

impl QueueClient {
    /// Create a client persisting its session to `config.session_file`
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let store = Arc::new(FileStore::new(config.session_file.clone()));
        Self::with_store(config, store, Route::Staff)
    }

    /// Create a client over an explicit credential store
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        initial_route: Route,
    ) -> Result<Self, ClientError> {
        let state = Arc::new(SessionState::new(store, Navigator::new(initial_route)));
        match state.restore() {
            Ok(true) => tracing::info!("Restored saved session"),
            Ok(false) => tracing::debug!("No saved session"),
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable saved session"),
        }

        let hooks = Arc::new(SessionHooks::new(Arc::clone(&state)));
        let transport = Transport::builder(config.base_url.clone())
            .timeout(config.request_timeout())
            .request_hook(hooks.clone())
            .response_hook(hooks)
            .build()?;
        let api = Arc::new(HttpApi::new(Arc::new(transport)));

        tracing::info!(base_url = %config.base_url, "Queue client ready");

        Ok(Self {
            session: SessionManager::new(Arc::clone(&state), api.clone()),
            gate: AccessGate::new(state),
            config,
            api,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Login, logout and profile
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Shared route
    pub fn navigator(&self) -> &Navigator {
        self.session.state().navigator()
    }

    /// Gate for protected routes
    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    /// Authenticated queue API
    pub fn queue_api(&self) -> Arc<dyn QueueApi> {
        self.api.clone()
    }

    /// Polling parameters from the configuration
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions::from(&self.config)
    }

    /// Mount the staff synchronizer. Callers gate the route first.
    pub async fn mount_staff(&self) -> Mounted<QueueSynchronizer> {
        QueueSynchronizer::mount(self.queue_api(), self.sync_options()).await
    }

    /// Mount the public display projector. It renders without a credential,
    /// but shares the hooked transport so a present token is still sent and a
    /// `401` still expires the session.
    pub async fn mount_display(&self) -> Mounted<DisplayProjector> {
        DisplayProjector::mount(self.queue_api(), self.sync_options()).await
    }
}
