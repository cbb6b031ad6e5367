//! # Chope Client
//!
//! Typed HTTP access to the Chope REST API and a polling controller that
//! keeps a dashboard view (task board, coin balance, notifications) in sync
//! with the server's event log.

pub mod api;
pub mod controller;

pub use api::{ApiClient, ClientError};
pub use controller::{DashboardController, DashboardSnapshot, RefreshOutcome};
