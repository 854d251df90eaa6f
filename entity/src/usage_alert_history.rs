use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Threshold alert raised for a (workspace, feature) pair. The alert
/// engine keeps at most one unresolved row per (workspace, feature,
/// threshold); the storage layer does not enforce that invariant.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usage_alert_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub feature_code: String,
    pub threshold: i32,
    pub metadata: Option<Json>,
    pub created_at: TimeDateTimeWithTimeZone,
    pub resolved_at: Option<TimeDateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
