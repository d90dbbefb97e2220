use std::sync::Arc;
use std::time::Duration;

use crate::directory::{CentralDirectory, TenantDirectory};
use crate::session::{SessionError, SessionStore};
use crate::tenancy::{PermissionCache, TenancySwitcher, TenantConnector};

/// Where central records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentralBackend {
    Postgres,
    Fixture,
}

/// Shared collaborators handed to every middleware and handler.
#[derive(Clone)]
pub struct AppState {
    pub central: CentralBackend,
    pub directory: Arc<dyn CentralDirectory>,
    pub sessions: Arc<dyn SessionStore>,
    pub tenancy: Arc<TenancySwitcher>,
    pub permissions: Arc<PermissionCache>,
}

impl AppState {
    pub fn new(
        central: CentralBackend,
        directory: Arc<dyn CentralDirectory>,
        tenants: Arc<dyn TenantDirectory>,
        connector: Arc<dyn TenantConnector>,
        sessions: Arc<dyn SessionStore>,
        permission_cache_prefix: impl Into<String>,
        permission_cache_ttl: Duration,
    ) -> Self {
        Self {
            central,
            directory,
            sessions,
            tenancy: Arc::new(TenancySwitcher::new(tenants, connector, permission_cache_prefix)),
            permissions: Arc::new(PermissionCache::new(permission_cache_ttl)),
        }
    }

    /// Drops sessions whose token has expired and stale permission entries.
    pub async fn purge_expired(&self) -> Result<(usize, usize), SessionError> {
        let sessions = self.sessions.purge_expired(chrono::Utc::now().timestamp()).await?;
        let permissions = self.permissions.purge_expired();
        Ok((sessions, permissions))
    }
}
