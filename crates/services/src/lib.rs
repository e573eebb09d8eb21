#![forbid(unsafe_code)]

pub mod dashboard_service;
pub mod error;

pub use dashboard_service::{DashboardService, DashboardState};
pub use error::DashboardServiceError;
