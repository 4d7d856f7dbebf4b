//! Services composing repositories into dashboard queries

pub mod dashboard;

pub use dashboard::{DashboardService, ViolationReport};
