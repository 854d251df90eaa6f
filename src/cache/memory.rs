use super::{cache_key, workspace_pattern, EntitlementCache};
use crate::models::entitlement::EntitlementSnapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Process-local snapshot cache with per-entry expiry. Used in tests and
/// in deployments without a Redis URL.
pub struct InMemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (EntitlementSnapshot, Instant)>>,
}

impl InMemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl EntitlementCache for InMemoryCache {
    async fn get(&self, workspace_id: Uuid, feature_code: &str) -> Option<EntitlementSnapshot> {
        let key = cache_key(workspace_id, feature_code);
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(&key) {
            Some((snapshot, expires_at)) if *expires_at > Instant::now() => Some(snapshot.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, workspace_id: Uuid, feature_code: &str, snapshot: &EntitlementSnapshot) {
        let key = cache_key(workspace_id, feature_code);
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(key, (snapshot.clone(), expires_at));
    }

    async fn invalidate(&self, workspace_id: Uuid, feature_code: &str) {
        let key = cache_key(workspace_id, feature_code);
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .remove(&key);
    }

    async fn invalidate_workspace(&self, workspace_id: Uuid) {
        let prefix = workspace_pattern(workspace_id);
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .retain(|key, _| !key.starts_with(&prefix));
    }
}
