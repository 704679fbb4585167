//! Domain models.

pub mod audit;
pub mod band;
pub mod group;
pub mod pilgrim;
pub mod telemetry;

pub use audit::{AuditReport, PoolRepair, RepairReason};
pub use band::{Band, BandDetailResponse, BandStatus, BandSummary, RegisterBandRequest};
pub use group::{CreateGroupRequest, Group, GroupDetailResponse, StageBandRequest};
pub use pilgrim::{CreatePilgrimRequest, Pilgrim, PilgrimSummary, PilgrimWithBand};
pub use telemetry::{TelemetryAck, TelemetryReport};
