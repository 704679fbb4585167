//! Group entity (database row mapping).
//!
//! Pool membership lives in the group_pool_members join table; the entity
//! carries only the group row and is combined with its pool serials when
//! converted to the domain model.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::Group;

/// Database row mapping for the groups table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub name: String,
    pub moderator_ids: Vec<Uuid>,
    pub member_ids: Vec<Uuid>,
    pub enforce_pool: bool,
    pub created_at: DateTime<Utc>,
}

impl GroupEntity {
    /// Combines the group row with its pool serials into a domain model.
    pub fn into_group(self, pool: Vec<String>) -> Group {
        Group {
            id: self.id,
            name: self.name,
            moderator_ids: self.moderator_ids,
            member_ids: self.member_ids,
            enforce_pool: self.enforce_pool,
            pool,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_group() {
        let entity = GroupEntity {
            id: Uuid::new_v4(),
            name: "Mina Camp 12".to_string(),
            moderator_ids: vec![Uuid::new_v4()],
            member_ids: vec![],
            enforce_pool: true,
            created_at: Utc::now(),
        };
        let group = entity.clone().into_group(vec!["BAND-01".to_string()]);
        assert_eq!(group.id, entity.id);
        assert!(group.enforce_pool);
        assert_eq!(group.pool, vec!["BAND-01".to_string()]);
    }
}
