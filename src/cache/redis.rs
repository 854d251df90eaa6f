use super::{cache_key, workspace_pattern, EntitlementCache};
use crate::models::entitlement::EntitlementSnapshot;
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Redis-backed snapshot cache for deployments where multiple processes
/// share one cache layer. Snapshots are stored as JSON with a TTL set via
/// `SET .. EX`, so even a missed invalidation ages out.
pub struct RedisCache {
    client: Arc<Client>,
    ttl_seconds: u64,
}

impl RedisCache {
    pub fn new(client: Arc<Client>, ttl_seconds: u64) -> Self {
        Self {
            client,
            ttl_seconds,
        }
    }

    async fn try_get(&self, key: &str) -> redis::RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(key).await
    }

    async fn try_put(&self, key: &str, payload: String) -> redis::RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex(key, payload, self.ttl_seconds).await
    }

    async fn try_del(&self, key: &str) -> redis::RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del(key).await
    }

    async fn try_del_pattern(&self, prefix: &str) -> redis::RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let pattern = format!("{}*", prefix);

        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        if !keys.is_empty() {
            let _: () = conn.del(keys).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EntitlementCache for RedisCache {
    async fn get(&self, workspace_id: Uuid, feature_code: &str) -> Option<EntitlementSnapshot> {
        let key = cache_key(workspace_id, feature_code);
        match self.try_get(&key).await {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                // Fail open: a broken cache read degrades to recompute.
                warn!("Redis GET failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn put(&self, workspace_id: Uuid, feature_code: &str, snapshot: &EntitlementSnapshot) {
        let key = cache_key(workspace_id, feature_code);
        let payload = match serde_json::to_string(snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode snapshot for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.try_put(&key, payload).await {
            warn!("Redis SET failed for {}: {}", key, e);
        }
    }

    async fn invalidate(&self, workspace_id: Uuid, feature_code: &str) {
        let key = cache_key(workspace_id, feature_code);
        if let Err(e) = self.try_del(&key).await {
            // The TTL bounds staleness when an invalidation is lost.
            warn!("Redis DEL failed for {}: {}", key, e);
        }
    }

    async fn invalidate_workspace(&self, workspace_id: Uuid) {
        let prefix = workspace_pattern(workspace_id);
        if let Err(e) = self.try_del_pattern(&prefix).await {
            warn!("Redis SCAN/DEL failed for {}*: {}", prefix, e);
        }
    }
}
