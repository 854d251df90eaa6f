use crate::{
    cache::{EntitlementCache, InMemoryCache, NoopCache, RedisCache},
    config::Config,
    services::{
        AlertNotifier, AlertService, CatalogService, EntitlementService, LifecycleService,
        TracingNotifier,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

/// Assembled engine: one database connection, one cache, and the four
/// services wired together. Host applications hold one `Engine` and call
/// through its services.
#[derive(Clone)]
pub struct Engine {
    pub db: DatabaseConnection,
    pub cache: Arc<dyn EntitlementCache>,
    pub catalog: Arc<CatalogService>,
    pub entitlements: Arc<EntitlementService>,
    pub lifecycle: Arc<LifecycleService>,
    pub alerts: Arc<AlertService>,
    pub config: Arc<Config>,
}

impl Engine {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Connect to database
        let db = sea_orm::Database::connect(&config.database.url).await?;

        // Shared Redis cache when configured, process-local otherwise
        let cache: Arc<dyn EntitlementCache> = if !config.cache.enabled {
            Arc::new(NoopCache)
        } else if let Some(url) = &config.redis.url {
            let client = Arc::new(redis::Client::open(url.as_str())?);
            Arc::new(RedisCache::new(client, config.cache.ttl_seconds))
        } else {
            Arc::new(InMemoryCache::new(Duration::from_secs(
                config.cache.ttl_seconds,
            )))
        };

        Ok(Self::with_connection(
            db,
            cache,
            Arc::new(TracingNotifier),
            config,
        ))
    }

    /// Wire services over an existing connection. Used by tests and by
    /// hosts that manage their own pool, cache, or alert delivery.
    pub fn with_connection(
        db: DatabaseConnection,
        cache: Arc<dyn EntitlementCache>,
        notifier: Arc<dyn AlertNotifier>,
        config: Config,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(db.clone()));
        let alerts = Arc::new(AlertService::new(db.clone(), notifier));
        let entitlements = Arc::new(EntitlementService::new(
            db.clone(),
            cache.clone(),
            alerts.clone(),
            config.entitlement.stacking_policy,
        ));
        let lifecycle = Arc::new(LifecycleService::new(
            db.clone(),
            cache.clone(),
            catalog.clone(),
            alerts.clone(),
        ));

        Self {
            db,
            cache,
            catalog,
            entitlements,
            lifecycle,
            alerts,
            config: Arc::new(config),
        }
    }
}
