//! Persuratan - correspondence tracking for a legislative secretariat
//!
//! The server half (REST API over sea-orm, session auth, CSRF, exports and
//! the activity log) and a typed client for the same API.

pub mod access;
pub mod client;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod routes;
pub mod state;
pub mod tujuan;
pub mod unit;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
