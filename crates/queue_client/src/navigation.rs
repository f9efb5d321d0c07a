//! Process-wide current route.

use std::sync::Arc;
use tokio::sync::watch;

/// Navigable surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in form
    Login,
    /// Staff queue dashboard (protected)
    Staff,
    /// Public waiting-room display
    Display,
}

impl Route {
    /// Path under the application base
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Staff => "/",
            Self::Display => "/display",
        }
    }

    /// Look up a route by path
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/login" => Some(Self::Login),
            "/" | "" => Some(Self::Staff),
            "/display" => Some(Self::Display),
            _ => None,
        }
    }

    /// Whether the access gate applies
    pub fn requires_credential(&self) -> bool {
        matches!(self, Self::Staff)
    }

    /// Public surfaces render without the navigation bar
    pub fn is_public(&self) -> bool {
        !self.requires_credential()
    }
}

/// Shared handle to the current route. Clones observe the same value.
#[derive(Debug, Clone)]
pub struct Navigator {
    tx: Arc<watch::Sender<Route>>,
}

impl Navigator {
    /// Create a navigator starting at `initial`
    pub fn new(initial: Route) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Current route
    pub fn current(&self) -> Route {
        *self.tx.borrow()
    }

    /// Move to `route`
    pub fn navigate(&self, route: Route) {
        let previous = self.tx.send_replace(route);
        if previous != route {
            tracing::debug!(from = previous.path(), to = route.path(), "Navigating");
        }
    }

    /// Observe route changes
    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.tx.subscribe()
    }
}
