//! Tenancy switching: binds a request to the isolated database of the active
//! business and reverts the binding when the request ends.

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{BusinessId, Tenant, TenantData};
use crate::database::{DatabaseError, DatabaseManager};
use crate::directory::{DirectoryError, TenantDirectory};
use crate::identity::Identity;
use crate::session::AccessContext;

pub mod permissions;

pub use permissions::PermissionCache;

#[derive(Debug, Error)]
pub enum TenancyError {
    #[error("User not authenticated")]
    Unauthenticated,

    #[error("No active business selected")]
    NoActiveBusiness,

    /// The business points at a tenant the directory does not know.
    #[error("Business configuration error")]
    MissingTenant { business_id: BusinessId, tenant_id: String },

    #[error("Tenant database unavailable")]
    Connection(#[from] DatabaseError),

    #[error("Tenant directory unavailable")]
    Directory(#[from] DirectoryError),
}

/// Handle to one tenant's isolated storage.
#[derive(Clone, Debug)]
pub enum TenantDatabase {
    Postgres(PgPool),
    Memory(Arc<TenantData>),
}

impl TenantDatabase {
    /// Permission names granted to a user inside the tenant.
    pub async fn user_permissions(&self, user_id: Uuid) -> Result<Vec<String>, DatabaseError> {
        match self {
            TenantDatabase::Postgres(pool) => {
                let rows: Vec<(String,)> = sqlx::query_as(
                    r#"
                    SELECT p.name
                    FROM permissions p
                    JOIN model_has_permissions mhp ON mhp.permission_id = p.id
                    WHERE mhp.model_id = $1
                    ORDER BY p.name
                    "#,
                )
                .bind(user_id)
                .fetch_all(pool)
                .await?;
                Ok(rows.into_iter().map(|(name,)| name).collect())
            }
            TenantDatabase::Memory(data) => Ok(data.permissions.get(&user_id).cloned().unwrap_or_default()),
        }
    }
}

/// Opens the storage of a tenant.
#[async_trait]
pub trait TenantConnector: Send + Sync {
    async fn connect(&self, tenant: &Tenant) -> Result<TenantDatabase, DatabaseError>;
}

/// Uses the pooled Postgres connection of the tenant's database.
pub struct PgTenantConnector;

#[async_trait]
impl TenantConnector for PgTenantConnector {
    async fn connect(&self, tenant: &Tenant) -> Result<TenantDatabase, DatabaseError> {
        let pool = DatabaseManager::tenant_pool(&tenant.database).await?;
        Ok(TenantDatabase::Postgres(pool))
    }
}

/// The tenant a request is bound to.
#[derive(Clone, Debug)]
pub struct TenantBinding {
    tenant: Tenant,
    business_id: BusinessId,
    database: TenantDatabase,
    cache_prefix: String,
}

impl TenantBinding {
    pub fn tenant_id(&self) -> &str {
        &self.tenant.id
    }

    pub fn database_name(&self) -> &str {
        &self.tenant.database
    }

    pub fn business_id(&self) -> BusinessId {
        self.business_id
    }

    pub fn database(&self) -> &TenantDatabase {
        &self.database
    }

    /// Cache namespace of this tenant, e.g. `permission.cache.tenant.acme:`.
    pub fn cache_namespace(&self) -> String {
        format!("{}{}:", self.cache_prefix, self.tenant.id)
    }

    pub fn cache_key(&self, suffix: &str) -> String {
        format!("{}{}", self.cache_namespace(), suffix)
    }
}

/// Slot holding at most one binding for the lifetime of a request.
#[derive(Debug, Default)]
pub struct TenancyScope {
    bound: Mutex<Option<TenantBinding>>,
}

impl TenancyScope {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_initialized(&self) -> bool {
        self.bound.lock().is_some()
    }

    pub fn current(&self) -> Option<TenantBinding> {
        self.bound.lock().clone()
    }

    /// Binds the scope. The binding lives until the returned guard drops.
    fn bind(self: &Arc<Self>, binding: TenantBinding) -> TenancyGuard {
        *self.bound.lock() = Some(binding);
        TenancyGuard { scope: Arc::clone(self) }
    }

    fn revert(&self) {
        if let Some(binding) = self.bound.lock().take() {
            tracing::debug!("Reverted tenancy for tenant '{}'", binding.tenant_id());
        }
    }
}

/// Reverts its scope on drop, including during unwinding.
#[must_use = "dropping the guard reverts the tenant binding"]
#[derive(Debug)]
pub struct TenancyGuard {
    scope: Arc<TenancyScope>,
}

impl TenancyGuard {
    pub fn binding(&self) -> Option<TenantBinding> {
        self.scope.current()
    }
}

impl Drop for TenancyGuard {
    fn drop(&mut self) {
        self.scope.revert();
    }
}

pub struct TenancySwitcher {
    tenants: Arc<dyn TenantDirectory>,
    connector: Arc<dyn TenantConnector>,
    cache_prefix: String,
}

impl TenancySwitcher {
    pub fn new(
        tenants: Arc<dyn TenantDirectory>,
        connector: Arc<dyn TenantConnector>,
        cache_prefix: impl Into<String>,
    ) -> Self {
        Self {
            tenants,
            connector,
            cache_prefix: cache_prefix.into(),
        }
    }

    /// Binds `scope` to the tenant of the active business.
    ///
    /// Returns `Ok(None)` when the scope is already bound; the existing guard
    /// stays in charge of reverting it.
    pub async fn ensure_initialized(
        &self,
        scope: &Arc<TenancyScope>,
        identity: Option<&Identity>,
        context: Option<&AccessContext>,
    ) -> Result<Option<TenancyGuard>, TenancyError> {
        if scope.is_initialized() {
            return Ok(None);
        }

        let identity = identity.ok_or(TenancyError::Unauthenticated)?;

        let business = context
            .and_then(|context| context.active_business.as_ref())
            .ok_or(TenancyError::NoActiveBusiness)?;
        let tenant_id = business
            .tenant_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(TenancyError::NoActiveBusiness)?;

        let tenant = match self.tenants.find_tenant(tenant_id).await? {
            Some(tenant) => tenant,
            None => {
                tracing::error!(
                    "Tenant '{}' of business {} not found in tenant directory (orphaned business record)",
                    tenant_id,
                    business.id
                );
                return Err(TenancyError::MissingTenant {
                    business_id: business.id,
                    tenant_id: tenant_id.to_string(),
                });
            }
        };

        let database = self.connector.connect(&tenant).await.map_err(|e| {
            tracing::error!("Failed to open database '{}' for tenant '{}': {}", tenant.database, tenant.id, e);
            TenancyError::Connection(e)
        })?;

        tracing::debug!("Initialized tenancy for tenant '{}' (user {})", tenant.id, identity.id());

        let binding = TenantBinding {
            tenant,
            business_id: business.id,
            database,
            cache_prefix: self.cache_prefix.clone(),
        };
        Ok(Some(scope.bind(binding)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{directory, identity_for, session};
    use crate::access::select_business;

    fn switcher() -> TenancySwitcher {
        let directory = Arc::new(directory());
        TenancySwitcher::new(directory.clone(), directory, "perm.")
    }

    async fn context_for(email: &str, business_id: BusinessId) -> (Identity, AccessContext) {
        let directory = directory();
        let identity = identity_for(&directory, email).await;
        let mut session = session();
        select_business(&directory, &identity, &mut session, business_id).await.unwrap();
        (identity, session.context().clone())
    }

    #[tokio::test]
    async fn rebinding_after_revert_points_at_new_tenant_only() {
        let switcher = switcher();
        let scope = TenancyScope::new();
        let (identity, first) = context_for("multi@example.com", 1).await;
        let (_, second) = context_for("multi@example.com", 2).await;

        let guard = switcher.ensure_initialized(&scope, Some(&identity), Some(&first)).await.unwrap().unwrap();
        assert_eq!(scope.current().unwrap().tenant_id(), "tenant-one");
        drop(guard);
        assert!(!scope.is_initialized());

        let _guard = switcher.ensure_initialized(&scope, Some(&identity), Some(&second)).await.unwrap().unwrap();
        let binding = scope.current().unwrap();
        assert_eq!(binding.tenant_id(), "tenant-two");
        assert_eq!(binding.database_name(), "tenant_two");
        assert_eq!(binding.business_id(), 2);
    }

    #[tokio::test]
    async fn second_initialization_is_a_no_op() {
        let switcher = switcher();
        let scope = TenancyScope::new();
        let (identity, first) = context_for("multi@example.com", 1).await;
        let (_, second) = context_for("multi@example.com", 2).await;

        let _guard = switcher.ensure_initialized(&scope, Some(&identity), Some(&first)).await.unwrap();
        let again = switcher.ensure_initialized(&scope, Some(&identity), Some(&second)).await.unwrap();
        assert!(again.is_none());
        assert_eq!(scope.current().unwrap().tenant_id(), "tenant-one");
    }

    #[tokio::test]
    async fn binding_is_reverted_when_handler_panics() {
        let switcher = switcher();
        let scope = TenancyScope::new();
        let (identity, context) = context_for("multi@example.com", 1).await;
        let guard = switcher.ensure_initialized(&scope, Some(&identity), Some(&context)).await.unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = guard;
            panic!("handler failed");
        }));
        assert!(result.is_err());
        assert!(!scope.is_initialized());
    }

    #[tokio::test]
    async fn requires_identity_and_business() {
        let switcher = switcher();
        let scope = TenancyScope::new();
        let (identity, context) = context_for("multi@example.com", 1).await;

        let err = switcher.ensure_initialized(&scope, None, Some(&context)).await.unwrap_err();
        assert_eq!(err.to_string(), "User not authenticated");

        let err = switcher
            .ensure_initialized(&scope, Some(&identity), Some(&AccessContext::default()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No active business selected");
        assert!(!scope.is_initialized());
    }

    #[tokio::test]
    async fn orphaned_business_is_a_configuration_error() {
        let switcher = switcher();
        let scope = TenancyScope::new();
        let (identity, context) = context_for("orphan@example.com", 5).await;

        let err = switcher.ensure_initialized(&scope, Some(&identity), Some(&context)).await.unwrap_err();
        assert!(matches!(&err, TenancyError::MissingTenant { tenant_id, .. } if tenant_id == "ghost"));
        assert_eq!(err.to_string(), "Business configuration error");
    }

    #[tokio::test]
    async fn cache_keys_are_namespaced_by_tenant() {
        let switcher = switcher();
        let scope = TenancyScope::new();
        let (identity, context) = context_for("multi@example.com", 1).await;
        let guard = switcher.ensure_initialized(&scope, Some(&identity), Some(&context)).await.unwrap().unwrap();

        let binding = guard.binding().unwrap();
        assert_eq!(binding.cache_key("user:1"), "perm.tenant-one:user:1");
    }
}
