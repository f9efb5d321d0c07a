//! # Queue Client
//!
//! Client core for a walk-in patient queue service.
//!
//! ## Session
//! - [`session::SessionManager`]: login, logout, profile lookup
//! - [`session::SessionState`]: the single owner of the bearer credential
//! - [`gate::AccessGate`]: redirects protected routes to login when no
//!   credential is present
//!
//! ## Views
//! - [`synchronizer::QueueSynchronizer`]: staff view, polled and mutated
//! - [`display::DisplayProjector`]: public display, polled, no session
//!
//! Every collaborator call goes through [`transport::Transport`], whose
//! hooks attach the bearer token and clear the session on `401`.

pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod error;
pub mod gate;
pub mod models;
pub mod navigation;
pub mod poller;
pub mod session;
pub mod storage;
pub mod synchronizer;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::api::{AuthApi, HttpApi, QueueApi};
    pub use crate::client::QueueClient;
    pub use crate::config::{ClientConfig, FetchOrdering};
    pub use crate::dashboard::{RowAction, StaffRow, StaffView};
    pub use crate::display::{DisplayProjector, DisplayView, Upcoming};
    pub use crate::error::{ApiError, AuthError, ClientError, CommandError, FetchError};
    pub use crate::gate::{AccessGate, GateDecision};
    pub use crate::models::{EntryId, NewPatient, Priority, QueueEntry, QueueSnapshot, Status};
    pub use crate::navigation::{Navigator, Route};
    pub use crate::poller::{Mounted, PollHandle, SyncPhase};
    pub use crate::session::{SessionManager, SessionState};
    pub use crate::synchronizer::{QueueSynchronizer, RemovalRequest, SyncOptions};
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
