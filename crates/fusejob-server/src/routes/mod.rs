//! API routes.

pub mod health;
pub mod jobs;

pub use health::{health, health_routes};
pub use jobs::{diagnose_handler, job_handler, job_routes};
