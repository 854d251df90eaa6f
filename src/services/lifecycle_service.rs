use crate::{
    cache::EntitlementCache,
    cycle,
    error::{EngineError, Result},
    models::common::{ProvisionBoostOptions, ProvisionPackageOptions},
    services::{AlertService, CatalogService},
};
use entity::sea_orm_active_enums::{
    BoostDurationType, BoostStatus, LogAction, LogSource, PackageStatus,
};
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, PaginatorTrait, TransactionTrait};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

/// State-transition operations on workspace packages and boosts.
///
/// Every mutation writes the audit trail and invalidates the affected
/// resolver cache keys before returning, so the next `can()` call sees
/// the new state (read-your-writes within a process).
pub struct LifecycleService {
    db: DatabaseConnection,
    cache: Arc<dyn EntitlementCache>,
    catalog: Arc<CatalogService>,
    alerts: Arc<AlertService>,
}

impl LifecycleService {
    pub fn new(
        db: DatabaseConnection,
        cache: Arc<dyn EntitlementCache>,
        catalog: Arc<CatalogService>,
        alerts: Arc<AlertService>,
    ) -> Self {
        Self {
            db,
            cache,
            catalog,
            alerts,
        }
    }

    /// Provision a package to a workspace.
    ///
    /// Base packages replace each other: any other Active base package is
    /// cancelled in the same transaction, cancel-then-create, so the
    /// workspace never holds two active base packages. Always inserts a
    /// fresh row (provisioning twice yields two rows, never a merge).
    #[instrument(skip(self, options))]
    pub async fn provision_package(
        &self,
        workspace_id: Uuid,
        package_code: &str,
        options: ProvisionPackageOptions,
    ) -> Result<entity::workspace_packages::Model> {
        let package = self
            .catalog
            .find_package(package_code)
            .await?
            .filter(|package| package.is_active)
            .ok_or_else(|| {
                EngineError::NotFound(format!("Package {} does not exist", package_code))
            })?;

        let now = OffsetDateTime::now_utc();
        let txn = self.db.begin().await?;

        if package.is_base_package {
            let active = entity::workspace_packages::Entity::find()
                .filter(entity::workspace_packages::Column::WorkspaceId.eq(workspace_id))
                .filter(entity::workspace_packages::Column::Status.eq(PackageStatus::Active))
                .find_also_related(entity::packages::Entity)
                .all(&txn)
                .await?;

            // Re-provisioning the same base package also lands here: the
            // old row is replaced by a fresh one with a new anchor.
            for (held, held_package) in active {
                let held_package = match held_package {
                    Some(held_package) if held_package.is_base_package => held_package,
                    _ => continue,
                };

                let mut cancelled: entity::workspace_packages::ActiveModel = held.into();
                cancelled.status = Set(PackageStatus::Cancelled);
                cancelled.expires_at = Set(Some(now));
                cancelled.updated_at = Set(now);
                cancelled.update(&txn).await?;

                write_log(
                    &txn,
                    workspace_id,
                    LogAction::PackageCancelled,
                    options.source,
                    Some(json!({
                        "package": held_package.code,
                        "replaced_by": package.code,
                    })),
                )
                .await?;
            }
        }

        let provisioned = entity::workspace_packages::ActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            package_id: Set(package.id),
            status: Set(PackageStatus::Active),
            billing_cycle_anchor: Set(options.billing_cycle_anchor.unwrap_or(now)),
            expires_at: Set(options.expires_at),
            external_service_id: Set(options.external_service_id.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        write_log(
            &txn,
            workspace_id,
            LogAction::PackageProvisioned,
            options.source,
            Some(json!({ "package": package.code })),
        )
        .await?;

        txn.commit().await?;

        // Package-level changes touch every granted feature.
        self.cache.invalidate_workspace(workspace_id).await;

        info!(
            "Provisioned package {} to workspace {}",
            package.code, workspace_id
        );
        Ok(provisioned)
    }

    /// Suspend every Active package of the workspace. Silent no-op when
    /// nothing is Active.
    #[instrument(skip(self))]
    pub async fn suspend_workspace(&self, workspace_id: Uuid, source: LogSource) -> Result<()> {
        self.transition_all(
            workspace_id,
            PackageStatus::Active,
            PackageStatus::Suspended,
            LogAction::PackageSuspended,
            source,
        )
        .await
    }

    /// Reactivate every Suspended package of the workspace.
    #[instrument(skip(self))]
    pub async fn reactivate_workspace(&self, workspace_id: Uuid, source: LogSource) -> Result<()> {
        self.transition_all(
            workspace_id,
            PackageStatus::Suspended,
            PackageStatus::Active,
            LogAction::PackageReactivated,
            source,
        )
        .await
    }

    async fn transition_all(
        &self,
        workspace_id: Uuid,
        from: PackageStatus,
        to: PackageStatus,
        action: LogAction,
        source: LogSource,
    ) -> Result<()> {
        let held = entity::workspace_packages::Entity::find()
            .filter(entity::workspace_packages::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::workspace_packages::Column::Status.eq(from))
            .find_also_related(entity::packages::Entity)
            .all(&self.db)
            .await?;

        if held.is_empty() {
            return Ok(());
        }

        let now = OffsetDateTime::now_utc();
        let count = held.len();
        let txn = self.db.begin().await?;

        for (row, package) in held {
            let mut updated: entity::workspace_packages::ActiveModel = row.into();
            updated.status = Set(to);
            updated.updated_at = Set(now);
            updated.update(&txn).await?;

            write_log(
                &txn,
                workspace_id,
                action,
                source,
                package.map(|p| json!({ "package": p.code })),
            )
            .await?;
        }

        txn.commit().await?;
        self.cache.invalidate_workspace(workspace_id).await;

        info!(
            "Transitioned {} package(s) of workspace {} to {:?}",
            count, workspace_id, to
        );
        Ok(())
    }

    /// Cancel the workspace's holding of a package. Idempotent: a
    /// workspace without a live row for the package is a silent no-op
    /// (no error, no audit entry). An unknown package code still fails
    /// loudly, since that is a configuration error.
    #[instrument(skip(self))]
    pub async fn revoke_package(
        &self,
        workspace_id: Uuid,
        package_code: &str,
        source: LogSource,
    ) -> Result<()> {
        let package = self
            .catalog
            .find_package(package_code)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("Package {} does not exist", package_code))
            })?;

        let held = entity::workspace_packages::Entity::find()
            .filter(entity::workspace_packages::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::workspace_packages::Column::PackageId.eq(package.id))
            .filter(entity::workspace_packages::Column::Status.ne(PackageStatus::Cancelled))
            .all(&self.db)
            .await?;

        if held.is_empty() {
            return Ok(());
        }

        let now = OffsetDateTime::now_utc();
        let txn = self.db.begin().await?;

        for row in held {
            let mut cancelled: entity::workspace_packages::ActiveModel = row.into();
            cancelled.status = Set(PackageStatus::Cancelled);
            cancelled.expires_at = Set(Some(now));
            cancelled.updated_at = Set(now);
            cancelled.update(&txn).await?;

            write_log(
                &txn,
                workspace_id,
                LogAction::PackageCancelled,
                source,
                Some(json!({ "package": package.code })),
            )
            .await?;
        }

        txn.commit().await?;
        self.cache.invalidate_workspace(workspace_id).await;

        info!(
            "Revoked package {} from workspace {}",
            package.code, workspace_id
        );
        Ok(())
    }

    /// Grant a temporary boost for a feature. Defaults to a permanent
    /// AddLimit boost.
    #[instrument(skip(self, options))]
    pub async fn provision_boost(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
        options: ProvisionBoostOptions,
    ) -> Result<entity::boosts::Model> {
        let feature = self
            .catalog
            .find_feature(feature_code)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("Feature {} does not exist", feature_code))
            })?;

        if options.duration_type == BoostDurationType::FixedDuration
            && options.expires_at.is_none()
        {
            return Err(EngineError::BadRequest(
                "Fixed-duration boosts require expires_at".to_string(),
            ));
        }

        let now = OffsetDateTime::now_utc();
        let txn = self.db.begin().await?;

        let boost = entity::boosts::ActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            feature_code: Set(feature.code.clone()),
            boost_type: Set(options.boost_type),
            duration_type: Set(options.duration_type),
            limit_value: Set(options.limit_value),
            consumed_quantity: Set(0),
            status: Set(BoostStatus::Active),
            starts_at: Set(options.starts_at.unwrap_or(now)),
            expires_at: Set(options.expires_at),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        write_log(
            &txn,
            workspace_id,
            LogAction::BoostProvisioned,
            options.source,
            Some(json!({
                "feature": feature.code,
                "limit_value": options.limit_value,
            })),
        )
        .await?;

        txn.commit().await?;
        self.cache.invalidate(workspace_id, feature_code).await;

        info!(
            "Provisioned {:?} boost on {} for workspace {}",
            boost.duration_type, feature.code, workspace_id
        );
        Ok(boost)
    }

    /// Expire boosts whose duration has elapsed: CycleBound boosts once
    /// the billing cycle they started in has rolled over, FixedDuration
    /// boosts past their `expires_at`. Permanent boosts are never touched.
    #[instrument(skip(self))]
    pub async fn expire_cycle_bound_boosts(&self, workspace_id: Uuid) -> Result<()> {
        let now = OffsetDateTime::now_utc();
        let anchor = self.workspace_anchor(workspace_id, now).await?;

        let active = entity::boosts::Entity::find()
            .filter(entity::boosts::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::boosts::Column::Status.eq(BoostStatus::Active))
            .all(&self.db)
            .await?;

        let mut expiring = Vec::new();
        for boost in active {
            let reason = match boost.duration_type {
                BoostDurationType::Permanent => None,
                BoostDurationType::CycleBound => match anchor {
                    Some(anchor) if boost.starts_at < cycle::cycle_start(anchor, now) => {
                        Some("Billing cycle ended")
                    }
                    _ => None,
                },
                BoostDurationType::FixedDuration => match boost.expires_at {
                    Some(expires) if expires <= now => Some("Duration elapsed"),
                    _ => None,
                },
            };
            if let Some(reason) = reason {
                expiring.push((boost, reason));
            }
        }

        if expiring.is_empty() {
            return Ok(());
        }

        let mut touched_codes = BTreeSet::new();
        let txn = self.db.begin().await?;

        for (boost, reason) in expiring {
            let feature_code = boost.feature_code.clone();
            let mut expired: entity::boosts::ActiveModel = boost.into();
            expired.status = Set(BoostStatus::Expired);
            expired.updated_at = Set(now);
            expired.update(&txn).await?;

            write_log(
                &txn,
                workspace_id,
                LogAction::BoostExpired,
                LogSource::System,
                Some(json!({ "feature": feature_code, "reason": reason })),
            )
            .await?;

            touched_codes.insert(feature_code);
        }

        txn.commit().await?;

        for code in &touched_codes {
            self.cache.invalidate(workspace_id, code).await;
        }

        info!(
            "Expired boosts on {:?} for workspace {}",
            touched_codes, workspace_id
        );
        Ok(())
    }

    /// Scheduler entry point for billing-cycle rollover: expires elapsed
    /// boosts and, once per cycle, writes a `cycle.reset` audit entry with
    /// the prior cycle's ledger row count and resolves open usage alerts.
    /// Ledger rows themselves are never deleted here.
    #[instrument(skip(self))]
    pub async fn reset_billing_cycle(&self, workspace_id: Uuid) -> Result<()> {
        self.expire_cycle_bound_boosts(workspace_id).await?;

        let now = OffsetDateTime::now_utc();
        let Some(anchor) = self.workspace_anchor(workspace_id, now).await? else {
            return Ok(());
        };
        if cycle::cycles_elapsed(anchor, now) < 1 {
            return Ok(());
        }

        let current_start = cycle::cycle_start(anchor, now);

        // At most one reset entry per cycle.
        let already_reset = entity::entitlement_logs::Entity::find()
            .filter(entity::entitlement_logs::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::entitlement_logs::Column::Action.eq(LogAction::CycleReset))
            .filter(entity::entitlement_logs::Column::CreatedAt.gte(current_start))
            .one(&self.db)
            .await?;
        if already_reset.is_some() {
            return Ok(());
        }

        let previous_start = cycle::previous_cycle_start(anchor, now);
        let previous_cycle_records = entity::usage_records::Entity::find()
            .filter(entity::usage_records::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::usage_records::Column::RecordedAt.gte(previous_start))
            .filter(entity::usage_records::Column::RecordedAt.lt(current_start))
            .count(&self.db)
            .await?;

        write_log(
            &self.db,
            workspace_id,
            LogAction::CycleReset,
            LogSource::Scheduler,
            Some(json!({ "previous_cycle_records": previous_cycle_records })),
        )
        .await?;

        // Usage in the fresh window starts near zero, so open alerts from
        // the previous cycle are stale.
        let open = self.alerts.active_alerts_for_workspace(workspace_id).await?;
        let codes: BTreeSet<String> = open.into_iter().map(|alert| alert.feature_code).collect();
        for code in codes {
            self.alerts
                .resolve_all_for_feature(workspace_id, &code)
                .await?;
        }

        self.cache.invalidate_workspace(workspace_id).await;

        info!(
            "Billing cycle reset for workspace {} ({} prior-cycle records)",
            workspace_id, previous_cycle_records
        );
        Ok(())
    }

    /// Billing anchor of the most recently provisioned active package.
    async fn workspace_anchor(
        &self,
        workspace_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<OffsetDateTime>> {
        let packages: Vec<entity::workspace_packages::Model> =
            entity::workspace_packages::Entity::find()
                .filter(entity::workspace_packages::Column::WorkspaceId.eq(workspace_id))
                .filter(entity::workspace_packages::Column::Status.eq(PackageStatus::Active))
                .all(&self.db)
                .await?
                .into_iter()
                .filter(|package| package.expires_at.map_or(true, |expires| expires > now))
                .collect();
        Ok(crate::services::entitlement_service::billing_anchor(
            &packages,
        ))
    }
}

async fn write_log<C: ConnectionTrait>(
    conn: &C,
    workspace_id: Uuid,
    action: LogAction,
    source: LogSource,
    metadata: Option<serde_json::Value>,
) -> Result<()> {
    entity::entitlement_logs::ActiveModel {
        id: Set(Uuid::new_v4()),
        workspace_id: Set(workspace_id),
        action: Set(action),
        source: Set(source),
        metadata: Set(metadata),
        created_at: Set(OffsetDateTime::now_utc()),
    }
    .insert(conn)
    .await?;
    Ok(())
}
