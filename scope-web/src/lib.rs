//! Web interface for the SCOPE helmet-compliance dashboard
//!
//! Server-rendered pages for the home overview, the analytics dashboard and
//! the record browser, plus CSV exports, an image proxy to the object store
//! and a small JSON API. Every route except login and health requires a
//! session.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;
pub mod templates;

pub use error::{Error, Result};
pub use server::{create_app, WebConfig, WebServer};
pub use state::{AppState, DashboardSettings};

pub use scope_core as core;
pub use scope_storage as storage;
