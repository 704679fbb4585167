//! Entity definitions (database row mappings).

mod band;
mod group;
mod pilgrim;

pub use band::BandEntity;
pub use group::GroupEntity;
pub use pilgrim::PilgrimEntity;
