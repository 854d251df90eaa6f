use crate::{
    cache::EntitlementCache,
    cycle,
    error::{EngineError, Result},
    models::{
        common::{feature_category, FeatureUsage, StackingPolicy, UsageSummary},
        entitlement::{EntitlementResult, EntitlementSnapshot},
    },
    services::AlertService,
};
use entity::sea_orm_active_enums::{BoostDurationType, BoostStatus, FeatureType, PackageStatus, ResetType};
use sea_orm::{entity::*, query::*, DatabaseConnection};
use std::collections::BTreeSet;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

/// The entitlement resolver and usage ledger.
///
/// Reads flow catalog + workspace state + ledger into an
/// [`EntitlementResult`]; writes append to the ledger and invalidate the
/// resolver cache before returning, so a subsequent `can()` on any thread
/// recomputes from the durable store.
pub struct EntitlementService {
    db: DatabaseConnection,
    cache: Arc<dyn EntitlementCache>,
    alerts: Arc<AlertService>,
    stacking_policy: StackingPolicy,
}

impl EntitlementService {
    pub fn new(
        db: DatabaseConnection,
        cache: Arc<dyn EntitlementCache>,
        alerts: Arc<AlertService>,
        stacking_policy: StackingPolicy,
    ) -> Self {
        Self {
            db,
            cache,
            alerts,
            stacking_policy,
        }
    }

    /// May the workspace consume `quantity` units of the feature?
    ///
    /// Denial is a value (`allowed = false` with a human-readable
    /// reason), never an error. Quantities below one are clamped to one.
    #[instrument(skip(self))]
    pub async fn can(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
        quantity: i64,
    ) -> Result<EntitlementResult> {
        if let Some(snapshot) = self.cache.get(workspace_id, feature_code).await {
            return Ok(snapshot.to_result(quantity));
        }

        let snapshot = self.resolve(workspace_id, feature_code).await?;
        self.cache.put(workspace_id, feature_code, &snapshot).await;
        Ok(snapshot.to_result(quantity))
    }

    /// Append a consumption event to the ledger.
    ///
    /// Recording is separate from authorization: the row is written even
    /// when it pushes usage past the limit (callers are expected to call
    /// `can()` first). The ledger write commits before the cache key is
    /// invalidated, and the alert engine is fed the fresh numbers last.
    #[instrument(skip(self, metadata))]
    pub async fn record_usage(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
        quantity: i64,
        user_id: Option<Uuid>,
        metadata: Option<serde_json::Value>,
    ) -> Result<entity::usage_records::Model> {
        if quantity < 1 {
            return Err(EngineError::BadRequest(format!(
                "Usage quantity must be at least 1, got {}",
                quantity
            )));
        }

        let record = entity::usage_records::ActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            feature_code: Set(feature_code.to_string()),
            quantity: Set(quantity),
            user_id: Set(user_id),
            metadata: Set(metadata),
            recorded_at: Set(OffsetDateTime::now_utc()),
        }
        .insert(&self.db)
        .await?;

        self.cache.invalidate(workspace_id, feature_code).await;

        // Alerting works off resolver output, so recompute after the write.
        let snapshot = self.resolve(workspace_id, feature_code).await?;
        if let EntitlementSnapshot::Limited { limit, used, .. } = &snapshot {
            self.alerts
                .evaluate(workspace_id, feature_code, *used, *limit)
                .await?;
        }

        info!(
            "Recorded {} units of {} for workspace {}",
            quantity, feature_code, workspace_id
        );
        Ok(record)
    }

    /// Recompute the entitlement snapshot from the store of record.
    pub(crate) async fn resolve(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
    ) -> Result<EntitlementSnapshot> {
        let now = OffsetDateTime::now_utc();

        let feature = entity::features::Entity::find()
            .filter(entity::features::Column::Code.eq(feature_code))
            .one(&self.db)
            .await?;

        let feature = match feature {
            Some(feature) if feature.is_active => feature,
            _ => {
                return Ok(EntitlementSnapshot::MissingFeature {
                    feature_code: feature_code.to_string(),
                })
            }
        };

        let packages = self.active_workspace_packages(workspace_id, now).await?;
        let anchor = billing_anchor(&packages);

        let package_ids: Vec<Uuid> = packages.iter().map(|p| p.id).collect();
        let grants: Vec<Option<i64>> = if package_ids.is_empty() {
            Vec::new()
        } else {
            entity::package_features::Entity::find()
                .filter(entity::package_features::Column::PackageId.is_in(package_ids))
                .filter(entity::package_features::Column::FeatureId.eq(feature.id))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|grant| grant.limit_value)
                .collect()
        };

        let boosts = self
            .active_boosts_for_feature(workspace_id, feature_code, now, anchor)
            .await?;

        if grants.is_empty() && boosts.is_empty() {
            return Ok(EntitlementSnapshot::NotGranted {
                feature_code: feature_code.to_string(),
            });
        }

        match feature.feature_type {
            FeatureType::Boolean => Ok(EntitlementSnapshot::BooleanAllow {
                feature_code: feature_code.to_string(),
            }),
            FeatureType::Unlimited => {
                let used = self
                    .used_in_window(workspace_id, feature_code, feature.reset_type, anchor, now)
                    .await?;
                Ok(EntitlementSnapshot::Unlimited {
                    feature_code: feature_code.to_string(),
                    used,
                })
            }
            FeatureType::Limit => {
                let used = self
                    .used_in_window(workspace_id, feature_code, feature.reset_type, anchor, now)
                    .await?;

                // A grant or boost without a limit value means unlimited.
                let unlimited_grant = grants.iter().any(|limit| limit.is_none())
                    || boosts.iter().any(|boost| boost.limit_value.is_none());
                if unlimited_grant {
                    return Ok(EntitlementSnapshot::Unlimited {
                        feature_code: feature_code.to_string(),
                        used,
                    });
                }

                let grant_values: Vec<i64> = grants.into_iter().flatten().collect();
                let base = match self.stacking_policy {
                    StackingPolicy::TakeMax => grant_values.iter().copied().max().unwrap_or(0),
                    StackingPolicy::Sum => grant_values.iter().sum(),
                };
                let boosted: i64 = boosts.iter().filter_map(|boost| boost.limit_value).sum();

                Ok(EntitlementSnapshot::Limited {
                    feature_code: feature_code.to_string(),
                    limit: base + boosted,
                    used,
                })
            }
        }
    }

    /// Sum of ledger quantities within the current reset window.
    async fn used_in_window(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
        reset_type: ResetType,
        anchor: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> Result<i64> {
        let window_start = match reset_type {
            ResetType::None => None,
            ResetType::Monthly => Some(match anchor {
                Some(anchor) => cycle::cycle_start(anchor, now),
                // Boost-only workspaces have no anchor to bill against.
                None => cycle::calendar_month_start(now),
            }),
        };

        let mut query = entity::usage_records::Entity::find()
            .filter(entity::usage_records::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::usage_records::Column::FeatureCode.eq(feature_code));
        if let Some(start) = window_start {
            query = query.filter(entity::usage_records::Column::RecordedAt.gte(start));
        }

        let used = query
            .select_only()
            .column_as(entity::usage_records::Column::Quantity.sum(), "used")
            .into_tuple::<Option<i64>>()
            .one(&self.db)
            .await?
            .flatten()
            .unwrap_or(0);
        Ok(used)
    }

    async fn active_workspace_packages(
        &self,
        workspace_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<entity::workspace_packages::Model>> {
        let packages = entity::workspace_packages::Entity::find()
            .filter(entity::workspace_packages::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::workspace_packages::Column::Status.eq(PackageStatus::Active))
            .all(&self.db)
            .await?
            .into_iter()
            .filter(|package| package.expires_at.map_or(true, |expires| expires > now))
            .collect();
        Ok(packages)
    }

    /// Active boosts for one feature whose duration has not elapsed.
    async fn active_boosts_for_feature(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
        now: OffsetDateTime,
        anchor: Option<OffsetDateTime>,
    ) -> Result<Vec<entity::boosts::Model>> {
        let boosts = entity::boosts::Entity::find()
            .filter(entity::boosts::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::boosts::Column::FeatureCode.eq(feature_code))
            .filter(entity::boosts::Column::Status.eq(BoostStatus::Active))
            .all(&self.db)
            .await?
            .into_iter()
            .filter(|boost| boost_is_live(boost, now, anchor))
            .collect();
        Ok(boosts)
    }

    /// Active packages held by the workspace (non-expired, non-suspended).
    pub async fn get_active_packages(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<entity::workspace_packages::Model>> {
        self.active_workspace_packages(workspace_id, OffsetDateTime::now_utc())
            .await
    }

    /// Active boosts across all features, filtered by duration validity.
    pub async fn get_active_boosts(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<entity::boosts::Model>> {
        let now = OffsetDateTime::now_utc();
        let packages = self.active_workspace_packages(workspace_id, now).await?;
        let anchor = billing_anchor(&packages);

        let boosts = entity::boosts::Entity::find()
            .filter(entity::boosts::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::boosts::Column::Status.eq(BoostStatus::Active))
            .all(&self.db)
            .await?
            .into_iter()
            .filter(|boost| boost_is_live(boost, now, anchor))
            .collect();
        Ok(boosts)
    }

    /// Usage summary grouped per feature category, covering every feature
    /// reachable through active package grants or active boosts.
    #[instrument(skip(self))]
    pub async fn get_usage_summary(&self, workspace_id: Uuid) -> Result<UsageSummary> {
        let now = OffsetDateTime::now_utc();
        let packages = self.active_workspace_packages(workspace_id, now).await?;
        let package_ids: Vec<Uuid> = packages.iter().map(|p| p.id).collect();

        let mut codes = BTreeSet::new();
        if !package_ids.is_empty() {
            let granted = entity::package_features::Entity::find()
                .filter(entity::package_features::Column::PackageId.is_in(package_ids))
                .find_also_related(entity::features::Entity)
                .all(&self.db)
                .await?;
            for (_, feature) in granted {
                if let Some(feature) = feature {
                    codes.insert(feature.code);
                }
            }
        }
        for boost in self.get_active_boosts(workspace_id).await? {
            codes.insert(boost.feature_code);
        }

        let mut summary = UsageSummary::default();
        for code in codes {
            let feature = entity::features::Entity::find()
                .filter(entity::features::Column::Code.eq(code.as_str()))
                .one(&self.db)
                .await?;
            let Some(feature) = feature else { continue };
            if !feature.is_active {
                continue;
            }

            let entry = match self.resolve(workspace_id, &code).await? {
                EntitlementSnapshot::BooleanAllow { .. } => FeatureUsage {
                    feature_code: code.clone(),
                    name: feature.name,
                    used: 0,
                    limit: None,
                    remaining: None,
                    unlimited: false,
                },
                EntitlementSnapshot::Unlimited { used, .. } => FeatureUsage {
                    feature_code: code.clone(),
                    name: feature.name,
                    used,
                    limit: None,
                    remaining: None,
                    unlimited: true,
                },
                EntitlementSnapshot::Limited { limit, used, .. } => FeatureUsage {
                    feature_code: code.clone(),
                    name: feature.name,
                    used,
                    limit: Some(limit),
                    remaining: Some((limit - used).max(0)),
                    unlimited: false,
                },
                // Codes come from live grants/boosts, so these do not occur.
                EntitlementSnapshot::MissingFeature { .. }
                | EntitlementSnapshot::NotGranted { .. } => continue,
            };

            summary
                .categories
                .entry(feature_category(&code).to_string())
                .or_default()
                .push(entry);
        }

        Ok(summary)
    }
}

/// Anchor of the most recently provisioned active package, if any.
pub(crate) fn billing_anchor(
    packages: &[entity::workspace_packages::Model],
) -> Option<OffsetDateTime> {
    packages
        .iter()
        .max_by_key(|package| package.created_at)
        .map(|package| package.billing_cycle_anchor)
}

/// Whether an Active boost's duration is still running at `now`.
pub(crate) fn boost_is_live(
    boost: &entity::boosts::Model,
    now: OffsetDateTime,
    anchor: Option<OffsetDateTime>,
) -> bool {
    if boost.starts_at > now {
        return false;
    }
    match boost.duration_type {
        BoostDurationType::Permanent => true,
        BoostDurationType::FixedDuration => {
            boost.expires_at.map_or(false, |expires| expires > now)
        }
        BoostDurationType::CycleBound => match anchor {
            // Live only while the cycle it started in is still current.
            Some(anchor) => boost.starts_at >= cycle::cycle_start(anchor, now),
            None => true,
        },
    }
}
