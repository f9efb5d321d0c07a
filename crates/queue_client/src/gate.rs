//! Access gate for protected routes.
//!
//! Decides synchronously from credential presence alone. A stale token is let
//! through; its rejection by the collaborator is what bounces the user.

use std::sync::Arc;

use crate::navigation::Route;
use crate::session::SessionState;

/// Outcome of a gate evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Render the protected view
    Render,
    /// Send the user elsewhere instead
    Redirect(Route),
}

/// Pure decision from credential presence
pub fn evaluate(credential_present: bool) -> GateDecision {
    if credential_present {
        GateDecision::Render
    } else {
        GateDecision::Redirect(Route::Login)
    }
}

/// Gate bound to the shared session
#[derive(Clone)]
pub struct AccessGate {
    session: Arc<SessionState>,
}

impl AccessGate {
    /// Bind the gate to `session`
    pub fn new(session: Arc<SessionState>) -> Self {
        Self { session }
    }

    /// Evaluate for a protected view
    pub fn evaluate(&self) -> GateDecision {
        evaluate(self.session.is_authenticated())
    }

    /// Route that actually renders when `route` is requested
    pub fn resolve(&self, route: Route) -> Route {
        if !route.requires_credential() {
            return route;
        }
        match self.evaluate() {
            GateDecision::Render => route,
            GateDecision::Redirect(target) => {
                tracing::debug!(requested = route.path(), "No credential; redirecting");
                target
            }
        }
    }
}
