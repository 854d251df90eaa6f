use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named bundle of feature grants. At most one *base* package may be
/// active per workspace at a time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub is_base_package: bool,
    pub is_stackable: bool,
    pub is_active: bool,
    pub created_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::package_features::Entity")]
    PackageFeatures,
    #[sea_orm(has_many = "super::workspace_packages::Entity")]
    WorkspacePackages,
}

impl Related<super::package_features::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackageFeatures.def()
    }
}

impl Related<super::workspace_packages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkspacePackages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
