//! Core domain services.

pub mod assignment;
pub mod pool_audit;

pub use assignment::{AssignmentCoordinator, AssignmentError};
pub use pool_audit::PoolAuditor;
