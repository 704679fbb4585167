//! Persistence layer for Band Manager backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - The [`domain::store::BandStore`] implementations: [`PgStore`] for
//!   PostgreSQL and [`MemoryStore`] for tests and volatile deployments

pub mod db;
pub mod entities;
pub mod stores;

pub use stores::memory::MemoryStore;
pub use stores::postgres::PgStore;
