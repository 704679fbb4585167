//! HTTP route handlers.

pub mod admin;
pub mod assignments;
pub mod bands;
pub mod groups;
pub mod health;
pub mod pilgrims;
pub mod telemetry;
