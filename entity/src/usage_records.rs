use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only consumption event. The sum of `quantity` per
/// (workspace, feature) within the current reset window is the "used"
/// value the resolver reports.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usage_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub feature_code: String,
    pub quantity: i64,
    pub user_id: Option<Uuid>,
    pub metadata: Option<Json>,
    pub recorded_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
