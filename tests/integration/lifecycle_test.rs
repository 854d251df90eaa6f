use crate::support::*;
use entity::sea_orm_active_enums::{
    BoostDurationType, BoostStatus, LogAction, LogSource, PackageStatus, ResetType,
};
use gatemeter::models::common::{ProvisionBoostOptions, ProvisionPackageOptions};
use sea_orm::{entity::*, query::*, PaginatorTrait};
use uuid::Uuid;

async fn count_logs(env: &TestEnv, workspace: Uuid, action: LogAction) -> u64 {
    entity::entitlement_logs::Entity::find()
        .filter(entity::entitlement_logs::Column::WorkspaceId.eq(workspace))
        .filter(entity::entitlement_logs::Column::Action.eq(action))
        .count(&env.engine.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn provisioning_a_base_package_replaces_the_previous_one() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();

    env.engine
        .catalog
        .create_feature(limit_feature("ai.credits", ResetType::Monthly))
        .await
        .unwrap();
    env.engine
        .catalog
        .create_package(package("creator", true, &[("ai.credits", Some(100))]))
        .await
        .unwrap();
    let pro = env
        .engine
        .catalog
        .create_package(package("pro", true, &[("ai.credits", Some(500))]))
        .await
        .unwrap();

    env.engine
        .lifecycle
        .provision_package(workspace, "creator", ProvisionPackageOptions::default())
        .await
        .unwrap();
    env.engine
        .lifecycle
        .provision_package(workspace, "pro", ProvisionPackageOptions::default())
        .await
        .unwrap();

    // Exactly one Active row, and it belongs to the replacement package.
    let active = entity::workspace_packages::Entity::find()
        .filter(entity::workspace_packages::Column::WorkspaceId.eq(workspace))
        .filter(entity::workspace_packages::Column::Status.eq(PackageStatus::Active))
        .all(&env.engine.db)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].package_id, pro.id);

    // The replaced package was cancelled with an expiry stamp.
    let cancelled = entity::workspace_packages::Entity::find()
        .filter(entity::workspace_packages::Column::WorkspaceId.eq(workspace))
        .filter(entity::workspace_packages::Column::Status.eq(PackageStatus::Cancelled))
        .all(&env.engine.db)
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert!(cancelled[0].expires_at.is_some());

    // Limits follow the new package immediately.
    let result = env
        .engine
        .entitlements
        .can(workspace, "ai.credits", 1)
        .await
        .unwrap();
    assert_eq!(result.limit, Some(500));
}

#[tokio::test]
async fn provisioning_an_unknown_package_fails_loudly() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();

    let err = env
        .engine
        .lifecycle
        .provision_package(workspace, "no_such_package", ProvisionPackageOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn revoke_is_idempotent() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();

    env.engine
        .catalog
        .create_feature(limit_feature("ai.credits", ResetType::Monthly))
        .await
        .unwrap();
    env.engine
        .catalog
        .create_package(package("creator", true, &[("ai.credits", Some(100))]))
        .await
        .unwrap();
    env.engine
        .lifecycle
        .provision_package(workspace, "creator", ProvisionPackageOptions::default())
        .await
        .unwrap();

    env.engine
        .lifecycle
        .revoke_package(workspace, "creator", LogSource::Billing)
        .await
        .unwrap();
    // Second revoke: no error, no additional audit entry.
    env.engine
        .lifecycle
        .revoke_package(workspace, "creator", LogSource::Billing)
        .await
        .unwrap();

    assert_eq!(count_logs(&env, workspace, LogAction::PackageCancelled).await, 1);

    // Revoking a package that was never provisioned is also a no-op.
    env.engine
        .catalog
        .create_package(package("pro", true, &[("ai.credits", Some(500))]))
        .await
        .unwrap();
    env.engine
        .lifecycle
        .revoke_package(workspace, "pro", LogSource::Billing)
        .await
        .unwrap();
    assert_eq!(count_logs(&env, workspace, LogAction::PackageCancelled).await, 1);

    // An unknown package code is a configuration error, not a no-op.
    let err = env
        .engine
        .lifecycle
        .revoke_package(workspace, "no_such_package", LogSource::Billing)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn suspend_and_reactivate_toggle_entitlements_without_touching_the_ledger() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();

    env.engine
        .catalog
        .create_feature(limit_feature("ai.credits", ResetType::Monthly))
        .await
        .unwrap();
    env.engine
        .catalog
        .create_package(package("creator", true, &[("ai.credits", Some(100))]))
        .await
        .unwrap();
    env.engine
        .lifecycle
        .provision_package(workspace, "creator", ProvisionPackageOptions::default())
        .await
        .unwrap();
    env.engine
        .entitlements
        .record_usage(workspace, "ai.credits", 10, None, None)
        .await
        .unwrap();

    env.engine
        .lifecycle
        .suspend_workspace(workspace, LogSource::Billing)
        .await
        .unwrap();

    // Denied regardless of remaining quota while suspended.
    let suspended = env
        .engine
        .entitlements
        .can(workspace, "ai.credits", 1)
        .await
        .unwrap();
    assert!(!suspended.allowed);
    assert!(suspended.reason.unwrap().contains("plan does not include"));

    env.engine
        .lifecycle
        .reactivate_workspace(workspace, LogSource::Billing)
        .await
        .unwrap();

    // Quota state is exactly where it was.
    let reactivated = env
        .engine
        .entitlements
        .can(workspace, "ai.credits", 1)
        .await
        .unwrap();
    assert!(reactivated.allowed);
    assert_eq!(reactivated.used, 10);
    assert_eq!(reactivated.remaining, Some(90));

    assert_eq!(count_logs(&env, workspace, LogAction::PackageSuspended).await, 1);
    assert_eq!(count_logs(&env, workspace, LogAction::PackageReactivated).await, 1);
}

#[tokio::test]
async fn suspending_an_idle_workspace_writes_no_audit_entries() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();

    env.engine
        .lifecycle
        .suspend_workspace(workspace, LogSource::Billing)
        .await
        .unwrap();

    assert_eq!(count_logs(&env, workspace, LogAction::PackageSuspended).await, 0);
}

#[tokio::test]
async fn cycle_bound_boosts_expire_when_the_cycle_rolls_over() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();
    let now = time::OffsetDateTime::now_utc();

    env.engine
        .catalog
        .create_feature(limit_feature("ai.credits", ResetType::Monthly))
        .await
        .unwrap();
    env.engine
        .catalog
        .create_package(package("creator", true, &[("ai.credits", Some(100))]))
        .await
        .unwrap();

    // Anchor two cycles back; the current cycle started days ago.
    env.engine
        .lifecycle
        .provision_package(
            workspace,
            "creator",
            ProvisionPackageOptions {
                billing_cycle_anchor: Some(now - time::Duration::days(65)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Started in the previous cycle: must expire.
    env.engine
        .lifecycle
        .provision_boost(
            workspace,
            "ai.credits",
            ProvisionBoostOptions {
                duration_type: BoostDurationType::CycleBound,
                limit_value: Some(50),
                starts_at: Some(now - time::Duration::days(40)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    // Permanent: never auto-expired.
    env.engine
        .lifecycle
        .provision_boost(
            workspace,
            "ai.credits",
            ProvisionBoostOptions {
                limit_value: Some(25),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The stale cycle-bound boost no longer counts even before expiry runs.
    let result = env
        .engine
        .entitlements
        .can(workspace, "ai.credits", 1)
        .await
        .unwrap();
    assert_eq!(result.limit, Some(125));

    env.engine
        .lifecycle
        .expire_cycle_bound_boosts(workspace)
        .await
        .unwrap();

    let boosts = entity::boosts::Entity::find()
        .filter(entity::boosts::Column::WorkspaceId.eq(workspace))
        .all(&env.engine.db)
        .await
        .unwrap();
    let expired: Vec<_> = boosts
        .iter()
        .filter(|b| b.status == BoostStatus::Expired)
        .collect();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].duration_type, BoostDurationType::CycleBound);

    assert_eq!(count_logs(&env, workspace, LogAction::BoostExpired).await, 1);

    let result = env
        .engine
        .entitlements
        .can(workspace, "ai.credits", 1)
        .await
        .unwrap();
    assert_eq!(result.limit, Some(125));
}

#[tokio::test]
async fn fixed_duration_boosts_expire_after_their_deadline() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();
    let now = time::OffsetDateTime::now_utc();

    env.engine
        .catalog
        .create_feature(limit_feature("ai.credits", ResetType::Monthly))
        .await
        .unwrap();

    env.engine
        .lifecycle
        .provision_boost(
            workspace,
            "ai.credits",
            ProvisionBoostOptions {
                duration_type: BoostDurationType::FixedDuration,
                limit_value: Some(30),
                starts_at: Some(now - time::Duration::days(8)),
                expires_at: Some(now - time::Duration::days(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Already elapsed, so it never contributes.
    let result = env
        .engine
        .entitlements
        .can(workspace, "ai.credits", 1)
        .await
        .unwrap();
    assert!(!result.allowed);

    env.engine
        .lifecycle
        .expire_cycle_bound_boosts(workspace)
        .await
        .unwrap();

    let boosts = entity::boosts::Entity::find()
        .filter(entity::boosts::Column::WorkspaceId.eq(workspace))
        .all(&env.engine.db)
        .await
        .unwrap();
    assert_eq!(boosts.len(), 1);
    assert_eq!(boosts[0].status, BoostStatus::Expired);
}

#[tokio::test]
async fn fixed_duration_boosts_require_a_deadline() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();

    env.engine
        .catalog
        .create_feature(limit_feature("ai.credits", ResetType::Monthly))
        .await
        .unwrap();

    let err = env
        .engine
        .lifecycle
        .provision_boost(
            workspace,
            "ai.credits",
            ProvisionBoostOptions {
                duration_type: BoostDurationType::FixedDuration,
                limit_value: Some(30),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("expires_at"));
}

#[tokio::test]
async fn reset_billing_cycle_logs_once_per_cycle() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();
    let now = time::OffsetDateTime::now_utc();

    env.engine
        .catalog
        .create_feature(limit_feature("ai.credits", ResetType::Monthly))
        .await
        .unwrap();
    env.engine
        .catalog
        .create_package(package("creator", true, &[("ai.credits", Some(100))]))
        .await
        .unwrap();
    env.engine
        .lifecycle
        .provision_package(
            workspace,
            "creator",
            ProvisionPackageOptions {
                billing_cycle_anchor: Some(now - time::Duration::days(40)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Ledger rows from the previous cycle, inserted as fixtures.
    for _ in 0..3 {
        entity::usage_records::ActiveModel {
            id: Set(Uuid::new_v4()),
            workspace_id: Set(workspace),
            feature_code: Set("ai.credits".to_string()),
            quantity: Set(10),
            user_id: Set(None),
            metadata: Set(None),
            recorded_at: Set(now - time::Duration::days(35)),
        }
        .insert(&env.engine.db)
        .await
        .unwrap();
    }

    env.engine.lifecycle.reset_billing_cycle(workspace).await.unwrap();
    env.engine.lifecycle.reset_billing_cycle(workspace).await.unwrap();

    let resets = entity::entitlement_logs::Entity::find()
        .filter(entity::entitlement_logs::Column::WorkspaceId.eq(workspace))
        .filter(entity::entitlement_logs::Column::Action.eq(LogAction::CycleReset))
        .all(&env.engine.db)
        .await
        .unwrap();
    assert_eq!(resets.len(), 1);

    let metadata = resets[0].metadata.as_ref().unwrap();
    assert_eq!(metadata["previous_cycle_records"], 3);

    // Old-cycle rows are outside the current window but never deleted.
    let result = env
        .engine
        .entitlements
        .can(workspace, "ai.credits", 1)
        .await
        .unwrap();
    assert_eq!(result.used, 0);
    let remaining_rows = entity::usage_records::Entity::find()
        .filter(entity::usage_records::Column::WorkspaceId.eq(workspace))
        .count(&env.engine.db)
        .await
        .unwrap();
    assert_eq!(remaining_rows, 3);
}
