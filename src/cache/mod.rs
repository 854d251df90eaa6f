//! Short-TTL cache for resolved entitlement snapshots.
//!
//! Keys are scoped per (workspace, feature). The cache is an optimization
//! only: every implementation swallows its own failures (logging at
//! `warn!`), so a broken cache degrades to recomputation from the store of
//! record rather than surfacing errors to callers.

mod memory;
mod redis;

pub use self::memory::InMemoryCache;
pub use self::redis::RedisCache;

use crate::models::entitlement::EntitlementSnapshot;
use async_trait::async_trait;
use uuid::Uuid;

pub(crate) fn cache_key(workspace_id: Uuid, feature_code: &str) -> String {
    format!("entitlement:{}:{}", workspace_id, feature_code)
}

pub(crate) fn workspace_pattern(workspace_id: Uuid) -> String {
    format!("entitlement:{}:", workspace_id)
}

#[async_trait]
pub trait EntitlementCache: Send + Sync {
    async fn get(&self, workspace_id: Uuid, feature_code: &str) -> Option<EntitlementSnapshot>;
    async fn put(&self, workspace_id: Uuid, feature_code: &str, snapshot: &EntitlementSnapshot);
    async fn invalidate(&self, workspace_id: Uuid, feature_code: &str);
    async fn invalidate_workspace(&self, workspace_id: Uuid);
}

/// Cache used when caching is disabled in config: stores nothing, so
/// every `can()` recomputes from the store of record.
pub struct NoopCache;

#[async_trait]
impl EntitlementCache for NoopCache {
    async fn get(&self, _workspace_id: Uuid, _feature_code: &str) -> Option<EntitlementSnapshot> {
        None
    }

    async fn put(&self, _workspace_id: Uuid, _feature_code: &str, _snapshot: &EntitlementSnapshot) {}

    async fn invalidate(&self, _workspace_id: Uuid, _feature_code: &str) {}

    async fn invalidate_workspace(&self, _workspace_id: Uuid) {}
}
