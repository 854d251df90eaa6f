use crate::sea_orm_active_enums::{BoostDurationType, BoostStatus, BoostType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A temporary additive grant on top of package-derived limits.
///
/// `CycleBound` boosts expire at the workspace's billing-cycle boundary,
/// `FixedDuration` boosts when `expires_at` elapses, `Permanent` boosts
/// never auto-expire.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "boosts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub feature_code: String,
    pub boost_type: BoostType,
    pub duration_type: BoostDurationType,
    pub limit_value: Option<i64>,
    pub consumed_quantity: i64,
    pub status: BoostStatus,
    pub starts_at: TimeDateTimeWithTimeZone,
    pub expires_at: Option<TimeDateTimeWithTimeZone>,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
