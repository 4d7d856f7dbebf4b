//! Server application for the SCOPE compliance dashboard
//!
//! Wires configuration, storage and the web interface into one process.

pub mod config;
pub mod error;
pub mod server;


pub use error::{Error, Result};

pub use scope_core as core;
pub use scope_storage as storage;
pub use scope_web as web;
