use async_trait::async_trait;
use entity::sea_orm_active_enums::{FeatureType, ResetType};
use gatemeter::{
    cache::InMemoryCache,
    config::{CacheConfig, Config, DatabaseConfig, EntitlementConfig, RedisConfig},
    models::common::{FeatureGrant, FeatureSpec, PackageSpec, StackingPolicy},
    services::AlertNotifier,
    Engine,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub async fn setup_test_db() -> DatabaseConnection {
    gatemeter::telemetry::init();

    // A single connection keeps every query on the same in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);

    let db = Database::connect(options)
        .await
        .expect("Failed to connect to test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub fn test_config(stacking_policy: StackingPolicy) -> Config {
    Config {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        redis: RedisConfig::default(),
        cache: CacheConfig {
            ttl_seconds: 60,
            enabled: true,
        },
        entitlement: EntitlementConfig { stacking_policy },
    }
}

/// Captures dispatched threshold alerts for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(Uuid, String, i32)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(Uuid, String, i32)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn notify_threshold(
        &self,
        workspace_id: Uuid,
        feature_code: &str,
        threshold: i32,
        _used: i64,
        _limit: i64,
    ) {
        self.events
            .lock()
            .unwrap()
            .push((workspace_id, feature_code.to_string(), threshold));
    }
}

pub struct TestEnv {
    pub engine: Engine,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn setup_env() -> TestEnv {
    let db = setup_test_db().await;
    env_over(db, StackingPolicy::TakeMax)
}

/// Build an engine over an existing connection (for tests that need two
/// engines with different policies sharing one store).
pub fn env_over(db: DatabaseConnection, policy: StackingPolicy) -> TestEnv {
    let cache = Arc::new(InMemoryCache::new(Duration::from_secs(60)));
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Engine::with_connection(db, cache, notifier.clone(), test_config(policy));
    TestEnv { engine, notifier }
}

pub fn limit_feature(code: &str, reset_type: ResetType) -> FeatureSpec {
    FeatureSpec {
        code: code.to_string(),
        name: code.to_string(),
        feature_type: FeatureType::Limit,
        reset_type,
    }
}

pub fn boolean_feature(code: &str) -> FeatureSpec {
    FeatureSpec {
        code: code.to_string(),
        name: code.to_string(),
        feature_type: FeatureType::Boolean,
        reset_type: ResetType::None,
    }
}

pub fn unlimited_feature(code: &str) -> FeatureSpec {
    FeatureSpec {
        code: code.to_string(),
        name: code.to_string(),
        feature_type: FeatureType::Unlimited,
        reset_type: ResetType::None,
    }
}

pub fn package(
    code: &str,
    is_base_package: bool,
    grants: &[(&str, Option<i64>)],
) -> PackageSpec {
    PackageSpec {
        code: code.to_string(),
        name: code.to_string(),
        is_base_package,
        is_stackable: !is_base_package,
        grants: grants
            .iter()
            .map(|(feature_code, limit_value)| FeatureGrant {
                feature_code: feature_code.to_string(),
                limit_value: *limit_value,
            })
            .collect(),
    }
}
