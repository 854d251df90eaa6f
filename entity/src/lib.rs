pub mod boosts;
pub mod entitlement_logs;
pub mod features;
pub mod package_features;
pub mod packages;
pub mod sea_orm_active_enums;
pub mod usage_alert_history;
pub mod usage_records;
pub mod workspace_packages;
