//! Domain layer for Band Manager backend.
//!
//! This crate contains:
//! - Domain models (bands, pilgrims, groups, telemetry)
//! - The storage port ([`store::BandStore`]) implemented by the persistence crate
//! - Core services: the assignment coordinator and the pool consistency auditor

pub mod models;
pub mod services;
pub mod store;
