//! # Queue TUI
//!
//! Terminal front-end for the walk-in queue.
//!
//! ### Screens
//! - **Login**: email and password form
//! - **Staff**: counters, queue table, add form and row commands
//! - **Display**: public now-serving board, usable without signing in
//!
//! Uses ratatui for rendering and crossterm for terminal handling. The
//! screen follows the client's navigator, so a session expiry anywhere
//! lands back on Login.

pub mod app;
pub mod screens;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::app::{Action, App, RenderState, Screen, TuiApp};
}
