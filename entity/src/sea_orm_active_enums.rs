use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a feature is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    #[sea_orm(string_value = "limit")]
    Limit,
    #[sea_orm(string_value = "boolean")]
    Boolean,
    #[sea_orm(string_value = "unlimited")]
    Unlimited,
}

/// Over which span usage accumulates before it is considered fresh again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ResetType {
    #[sea_orm(string_value = "none")]
    None,
    #[sea_orm(string_value = "monthly")]
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "suspended")]
    Suspended,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum BoostType {
    #[sea_orm(string_value = "add_limit")]
    AddLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum BoostDurationType {
    #[sea_orm(string_value = "permanent")]
    Permanent,
    #[sea_orm(string_value = "cycle_bound")]
    CycleBound,
    #[sea_orm(string_value = "fixed_duration")]
    FixedDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum BoostStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Audit-trail action written by every lifecycle mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    #[sea_orm(string_value = "package.provisioned")]
    PackageProvisioned,
    #[sea_orm(string_value = "package.suspended")]
    PackageSuspended,
    #[sea_orm(string_value = "package.reactivated")]
    PackageReactivated,
    #[sea_orm(string_value = "package.cancelled")]
    PackageCancelled,
    #[sea_orm(string_value = "boost.provisioned")]
    BoostProvisioned,
    #[sea_orm(string_value = "boost.expired")]
    BoostExpired,
    #[sea_orm(string_value = "boost.cancelled")]
    BoostCancelled,
    #[sea_orm(string_value = "cycle.reset")]
    CycleReset,
}

/// Who triggered a lifecycle mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    #[sea_orm(string_value = "system")]
    System,
    #[sea_orm(string_value = "api")]
    Api,
    #[sea_orm(string_value = "billing")]
    Billing,
    #[sea_orm(string_value = "scheduler")]
    Scheduler,
    #[sea_orm(string_value = "admin")]
    Admin,
}
