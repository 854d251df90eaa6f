use crate::support::*;
use entity::sea_orm_active_enums::ResetType;
use gatemeter::models::common::ProvisionPackageOptions;
use uuid::Uuid;

async fn seed_limited_workspace(env: &TestEnv, workspace: Uuid, limit: i64) {
    env.engine
        .catalog
        .create_feature(limit_feature("ai.credits", ResetType::Monthly))
        .await
        .unwrap();
    env.engine
        .catalog
        .create_package(package("creator", true, &[("ai.credits", Some(limit))]))
        .await
        .unwrap();
    env.engine
        .lifecycle
        .provision_package(workspace, "creator", ProvisionPackageOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn crossing_a_band_twice_raises_one_alert() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();
    seed_limited_workspace(&env, workspace, 100).await;

    // 80% crossed.
    env.engine
        .entitlements
        .record_usage(workspace, "ai.credits", 80, None, None)
        .await
        .unwrap();
    // Still in the 80 band: no second alert.
    env.engine
        .entitlements
        .record_usage(workspace, "ai.credits", 5, None, None)
        .await
        .unwrap();

    let alerts = env
        .engine
        .alerts
        .active_alerts_for_workspace(workspace)
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].threshold, 80);
    assert_eq!(alerts[0].feature_code, "ai.credits");

    assert_eq!(
        env.notifier.events(),
        vec![(workspace, "ai.credits".to_string(), 80)]
    );
}

#[tokio::test]
async fn every_band_at_or_below_the_percentage_fires() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();
    seed_limited_workspace(&env, workspace, 100).await;

    env.engine
        .entitlements
        .record_usage(workspace, "ai.credits", 100, None, None)
        .await
        .unwrap();

    let mut thresholds: Vec<i32> = env
        .engine
        .alerts
        .active_alerts_for_workspace(workspace)
        .await
        .unwrap()
        .iter()
        .map(|alert| alert.threshold)
        .collect();
    thresholds.sort();
    assert_eq!(thresholds, vec![80, 90, 100]);
    assert_eq!(env.notifier.events().len(), 3);
}

#[tokio::test]
async fn resolving_clears_open_alerts_for_the_feature() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();
    seed_limited_workspace(&env, workspace, 100).await;

    env.engine
        .entitlements
        .record_usage(workspace, "ai.credits", 95, None, None)
        .await
        .unwrap();
    assert_eq!(
        env.engine
            .alerts
            .active_alerts_for_workspace(workspace)
            .await
            .unwrap()
            .len(),
        2
    );

    env.engine
        .alerts
        .resolve_all_for_feature(workspace, "ai.credits")
        .await
        .unwrap();

    assert!(env
        .engine
        .alerts
        .active_alerts_for_workspace(workspace)
        .await
        .unwrap()
        .is_empty());

    // Crossing again after resolution raises fresh alerts.
    env.engine
        .entitlements
        .record_usage(workspace, "ai.credits", 1, None, None)
        .await
        .unwrap();
    let reopened = env
        .engine
        .alerts
        .active_alerts_for_workspace(workspace)
        .await
        .unwrap();
    assert_eq!(reopened.len(), 2);
}

#[tokio::test]
async fn features_without_a_numeric_limit_never_alert() {
    let env = setup_env().await;
    let workspace = Uuid::new_v4();

    env.engine
        .catalog
        .create_feature(unlimited_feature("api.requests"))
        .await
        .unwrap();
    env.engine
        .catalog
        .create_feature(boolean_feature("branding.remove_badge"))
        .await
        .unwrap();
    env.engine
        .catalog
        .create_package(package(
            "creator",
            true,
            &[("api.requests", None), ("branding.remove_badge", None)],
        ))
        .await
        .unwrap();
    env.engine
        .lifecycle
        .provision_package(workspace, "creator", ProvisionPackageOptions::default())
        .await
        .unwrap();

    env.engine
        .entitlements
        .record_usage(workspace, "api.requests", 1000, None, None)
        .await
        .unwrap();
    env.engine
        .entitlements
        .record_usage(workspace, "branding.remove_badge", 1000, None, None)
        .await
        .unwrap();

    assert!(env
        .engine
        .alerts
        .active_alerts_for_workspace(workspace)
        .await
        .unwrap()
        .is_empty());
    assert!(env.notifier.events().is_empty());
}

#[tokio::test]
async fn cycle_reset_resolves_stale_alerts() {
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

    env.engine
        .entitlements
        .record_usage(workspace, "ai.credits", 90, None, None)
        .await
        .unwrap();
    assert!(!env
        .engine
        .alerts
        .active_alerts_for_workspace(workspace)
        .await
        .unwrap()
        .is_empty());

    env.engine.lifecycle.reset_billing_cycle(workspace).await.unwrap();

    assert!(env
        .engine
        .alerts
        .active_alerts_for_workspace(workspace)
        .await
        .unwrap()
        .is_empty());
}
