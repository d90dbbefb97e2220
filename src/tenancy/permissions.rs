use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::TenantBinding;
use crate::database::DatabaseError;

#[derive(Debug, Clone)]
struct CachedPermissions {
    permissions: Vec<String>,
    stored_at: Instant,
}

/// Process-wide cache of tenant-side user permissions.
///
/// Keys always start with the binding's tenant namespace, so one tenant's
/// entries can never answer a lookup made under another tenant. Entries
/// older than the TTL are misses and are dropped by `purge_expired`.
#[derive(Debug)]
pub struct PermissionCache {
    entries: RwLock<HashMap<String, CachedPermissions>>,
    ttl: Duration,
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn key(binding: &TenantBinding, user_id: Uuid) -> String {
        binding.cache_key(&format!("user:{}", user_id))
    }

    fn is_fresh(&self, entry: &CachedPermissions, now: Instant) -> bool {
        now.duration_since(entry.stored_at) < self.ttl
    }

    pub fn get(&self, binding: &TenantBinding, user_id: Uuid) -> Option<Vec<String>> {
        let now = Instant::now();
        self.entries
            .read()
            .get(&Self::key(binding, user_id))
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.permissions.clone())
    }

    pub fn put(&self, binding: &TenantBinding, user_id: Uuid, permissions: Vec<String>) {
        let entry = CachedPermissions {
            permissions,
            stored_at: Instant::now(),
        };
        self.entries.write().insert(Self::key(binding, user_id), entry);
    }

    /// Cached permissions, loading them from the tenant database on a miss.
    pub async fn permissions_for(&self, binding: &TenantBinding, user_id: Uuid) -> Result<Vec<String>, DatabaseError> {
        if let Some(permissions) = self.get(binding, user_id) {
            return Ok(permissions);
        }

        let permissions = binding.database().user_permissions(user_id).await?;
        self.put(binding, user_id, permissions.clone());
        Ok(permissions)
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| self.is_fresh(entry, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Tenant, TenantData};
    use crate::tenancy::TenantDatabase;
    use std::sync::Arc;

    fn binding(tenant_id: &str, data: TenantData) -> TenantBinding {
        TenantBinding {
            tenant: Tenant {
                id: tenant_id.to_string(),
                database: format!("tenant_{}", tenant_id),
            },
            business_id: 1,
            database: TenantDatabase::Memory(Arc::new(data)),
            cache_prefix: "perm.".to_string(),
        }
    }

    #[tokio::test]
    async fn same_user_is_cached_separately_per_tenant() {
        let user = Uuid::new_v4();
        let mut a_data = TenantData::default();
        a_data.permissions.insert(user, vec!["employees.view".to_string()]);
        let a = binding("a", a_data);
        let b = binding("b", TenantData::default());

        let cache = PermissionCache::new(Duration::from_secs(300));
        assert_eq!(cache.permissions_for(&a, user).await.unwrap(), vec!["employees.view"]);
        assert!(cache.permissions_for(&b, user).await.unwrap().is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn prefix_sharing_tenants_do_not_collide() {
        let user = Uuid::new_v4();
        let a = binding("a", TenantData::default());
        let ab = binding("ab", TenantData::default());

        let cache = PermissionCache::new(Duration::from_secs(300));
        cache.put(&a, user, vec!["x".to_string()]);
        cache.put(&ab, user, vec!["y".to_string()]);

        assert_eq!(cache.get(&a, user), Some(vec!["x".to_string()]));
        assert_eq!(cache.get(&ab, user), Some(vec!["y".to_string()]));
    }

    #[tokio::test]
    async fn expired_entries_are_reloaded_and_purged() {
        let user = Uuid::new_v4();
        let mut data = TenantData::default();
        data.permissions.insert(user, vec!["items.view".to_string()]);
        let a = binding("a", data);

        let cache = PermissionCache::new(Duration::ZERO);
        cache.put(&a, user, vec!["stale".to_string()]);
        assert_eq!(cache.get(&a, user), None);
        assert_eq!(cache.permissions_for(&a, user).await.unwrap(), vec!["items.view"]);

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn fresh_entries_survive_purge() {
        let user = Uuid::new_v4();
        let a = binding("a", TenantData::default());
        let cache = PermissionCache::new(Duration::from_secs(300));
        cache.put(&a, user, vec!["x".to_string()]);

        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.len(), 1);
    }
}
