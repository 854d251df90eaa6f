use crate::error::Result;
use async_trait::async_trait;
use sea_orm::{entity::*, query::*, sea_query::Expr, DatabaseConnection};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Percent-of-limit bands at which a workspace is alerted, in ascending
/// order. At most one unresolved alert exists per band per cycle.
pub const ALERT_THRESHOLDS: [i32; 3] = [80, 90, 100];

/// Delivery seam for threshold alerts. Actual delivery (email, webhook,
/// in-app) is the host application's concern; the default implementation
/// only logs.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify_threshold(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
        threshold: i32,
        used: i64,
        limit: i64,
    );
}

pub struct TracingNotifier;

#[async_trait]
impl AlertNotifier for TracingNotifier {
    async fn notify_threshold(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
        threshold: i32,
        used: i64,
        limit: i64,
    ) {
        info!(
            "Workspace {} crossed {}% of its {} limit ({} of {} used)",
            workspace_id, threshold, feature_code, used, limit
        );
    }
}

/// Bands at or below the current percentage of the limit.
fn bands_crossed(used: i64, limit: i64) -> Vec<i32> {
    if limit <= 0 {
        return Vec::new();
    }
    let percentage = (used as i128) * 100 / (limit as i128);
    ALERT_THRESHOLDS
        .iter()
        .copied()
        .filter(|band| percentage >= *band as i128)
        .collect()
}

pub struct AlertService {
    db: DatabaseConnection,
    notifier: Arc<dyn AlertNotifier>,
}

impl AlertService {
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn AlertNotifier>) -> Self {
        Self { db, notifier }
    }

    /// Compare fresh resolver output against the threshold bands and
    /// raise any newly crossed ones. Features without a numeric limit
    /// (boolean, unlimited) never reach this point.
    #[instrument(skip(self))]
    pub async fn evaluate(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
        used: i64,
        limit: i64,
    ) -> Result<()> {
        for band in bands_crossed(used, limit) {
            let unresolved = entity::usage_alert_history::Entity::find()
                .filter(entity::usage_alert_history::Column::WorkspaceId.eq(workspace_id))
                .filter(entity::usage_alert_history::Column::FeatureCode.eq(feature_code))
                .filter(entity::usage_alert_history::Column::Threshold.eq(band))
                .filter(entity::usage_alert_history::Column::ResolvedAt.is_null())
                .one(&self.db)
                .await?;

            if unresolved.is_some() {
                continue;
            }

            entity::usage_alert_history::ActiveModel {
                id: Set(Uuid::new_v4()),
                workspace_id: Set(workspace_id),
                feature_code: Set(feature_code.to_string()),
                threshold: Set(band),
                metadata: Set(Some(json!({ "used": used, "limit": limit }))),
                created_at: Set(time::OffsetDateTime::now_utc()),
                resolved_at: Set(None),
            }
            .insert(&self.db)
            .await?;

            self.notifier
                .notify_threshold(workspace_id, feature_code, band, used, limit)
                .await;
        }
        Ok(())
    }

    /// Resolve every open alert for a (workspace, feature) pair. Called
    /// when usage drops back below the bands, e.g. after a cycle reset or
    /// a plan upgrade.
    #[instrument(skip(self))]
    pub async fn resolve_all_for_feature(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
    ) -> Result<()> {
        entity::usage_alert_history::Entity::update_many()
            .col_expr(
                entity::usage_alert_history::Column::ResolvedAt,
                Expr::value(Some(time::OffsetDateTime::now_utc())),
            )
            .filter(entity::usage_alert_history::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::usage_alert_history::Column::FeatureCode.eq(feature_code))
            .filter(entity::usage_alert_history::Column::ResolvedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Unresolved alert rows for a workspace.
    pub async fn active_alerts_for_workspace(
        &self,
        workspace_id: Uuid,
    ) -> Result<Vec<entity::usage_alert_history::Model>> {
        let alerts = entity::usage_alert_history::Entity::find()
            .filter(entity::usage_alert_history::Column::WorkspaceId.eq(workspace_id))
            .filter(entity::usage_alert_history::Column::ResolvedAt.is_null())
            .order_by_asc(entity::usage_alert_history::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(alerts)
    }
}
