use crate::sea_orm_active_enums::{FeatureType, ResetType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A checkable capability. `code` is the stable external identifier
/// (dotted namespace, e.g. "ai.credits") referenced by grants, boosts
/// and usage records.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "features")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub feature_type: FeatureType,
    pub reset_type: ResetType,
    pub is_active: bool,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::package_features::Entity")]
    PackageFeatures,
}

impl Related<super::package_features::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackageFeatures.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
