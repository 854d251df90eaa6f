use entity::sea_orm_active_enums::{BoostDurationType, BoostType, FeatureType, LogSource, ResetType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// How multiple stackable package grants for the same feature combine
/// into one base limit. Boost limits are always summed on top.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackingPolicy {
    /// The highest grant wins.
    #[default]
    TakeMax,
    /// Grants add up.
    Sum,
}

/// Input for registering a feature in the catalog.
#[derive(Debug, Clone)]
pub struct FeatureSpec {
    pub code: String,
    pub name: String,
    pub feature_type: FeatureType,
    pub reset_type: ResetType,
}

/// A single feature grant inside a package definition.
/// `limit_value = None` means unlimited (or boolean-allow).
#[derive(Debug, Clone)]
pub struct FeatureGrant {
    pub feature_code: String,
    pub limit_value: Option<i64>,
}

/// Input for registering a package in the catalog.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    pub code: String,
    pub name: String,
    pub is_base_package: bool,
    pub is_stackable: bool,
    pub grants: Vec<FeatureGrant>,
}

#[derive(Debug, Clone)]
pub struct ProvisionPackageOptions {
    /// Overrides the billing cycle anchor (defaults to now).
    pub billing_cycle_anchor: Option<OffsetDateTime>,
    pub expires_at: Option<OffsetDateTime>,
    /// Identifier of the subscription in an external billing system.
    pub external_service_id: Option<String>,
    /// Recorded in the audit trail.
    pub source: LogSource,
}

impl Default for ProvisionPackageOptions {
    fn default() -> Self {
        Self {
            billing_cycle_anchor: None,
            expires_at: None,
            external_service_id: None,
            source: LogSource::System,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionBoostOptions {
    pub boost_type: BoostType,
    pub duration_type: BoostDurationType,
    pub limit_value: Option<i64>,
    /// Overrides the boost start (defaults to now).
    pub starts_at: Option<OffsetDateTime>,
    /// Required for `FixedDuration` boosts.
    pub expires_at: Option<OffsetDateTime>,
    /// Recorded in the audit trail.
    pub source: LogSource,
}

impl Default for ProvisionBoostOptions {
    fn default() -> Self {
        Self {
            boost_type: BoostType::AddLimit,
            duration_type: BoostDurationType::Permanent,
            limit_value: None,
            starts_at: None,
            expires_at: None,
            source: LogSource::System,
        }
    }
}

/// Per-feature entry of a workspace usage summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureUsage {
    pub feature_code: String,
    pub name: String,
    pub used: i64,
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
    pub unlimited: bool,
}

/// Usage summary grouped per feature category (the dotted-namespace
/// prefix of the feature code, e.g. "ai" for "ai.credits").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageSummary {
    pub categories: BTreeMap<String, Vec<FeatureUsage>>,
}

/// Category of a feature code: the segment before the first dot, or the
/// whole code when it has no namespace.
pub fn feature_category(code: &str) -> &str {
    code.split_once('.').map(|(head, _)| head).unwrap_or(code)
}
