use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::{CentralDirectory, DirectoryError, TenantDirectory};
use crate::auth::hash_password;
use crate::database::models::{
    Business, BusinessId, BusinessRecord, Module, ResellerId, Subscription, Tenant, TenantData, User,
    UserType,
};
use crate::database::DatabaseError;
use crate::tenancy::{TenantConnector, TenantDatabase};

/// YAML description of a central directory, used for local runs and tests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    #[serde(default)]
    pub businesses: Vec<FixtureBusiness>,
    #[serde(default)]
    pub packages: Vec<FixturePackage>,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub tenants: Vec<FixtureTenant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub user_type: UserType,
    #[serde(default)]
    pub reseller_id: Option<ResellerId>,
    #[serde(default)]
    pub businesses: Vec<BusinessId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureBusiness {
    #[serde(flatten)]
    pub business: Business,
    #[serde(default)]
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixturePackage {
    pub id: i64,
    pub name: String,
    /// Module codes bundled in the package.
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureTenant {
    pub id: String,
    pub database: String,
    #[serde(default)]
    pub permissions: HashMap<Uuid, Vec<String>>,
}

/// Read-only directory held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: HashMap<Uuid, User>,
    links: HashMap<Uuid, Vec<BusinessId>>,
    businesses: BTreeMap<BusinessId, FixtureBusiness>,
    packages: HashMap<i64, Vec<String>>,
    modules: HashMap<String, Module>,
    tenants: HashMap<String, (Tenant, Arc<TenantData>)>,
}

impl InMemoryDirectory {
    pub fn from_fixture(fixture: Fixture) -> Self {
        let mut directory = Self::default();

        for user in fixture.users {
            directory.links.insert(user.id, user.businesses.clone());
            directory.users.insert(
                user.id,
                User {
                    id: user.id,
                    name: user.name,
                    email: user.email,
                    user_type: user.user_type,
                    reseller_id: user.reseller_id,
                    password_hash: hash_password(&user.password),
                    is_active: user.is_active,
                },
            );
        }
        for business in fixture.businesses {
            directory.businesses.insert(business.business.id, business);
        }
        for package in fixture.packages {
            directory.packages.insert(package.id, package.modules);
        }
        for module in fixture.modules {
            directory.modules.insert(module.code.clone(), module);
        }
        for tenant in fixture.tenants {
            let data = TenantData { permissions: tenant.permissions };
            directory.tenants.insert(
                tenant.id.clone(),
                (Tenant { id: tenant.id, database: tenant.database }, Arc::new(data)),
            );
        }

        directory
    }

    pub fn from_yaml(source: &str) -> Result<Self, DirectoryError> {
        let fixture: Fixture = serde_yaml::from_str(source)
            .map_err(|e| DirectoryError::Malformed(format!("fixture: {}", e)))?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| DirectoryError::Query(format!("reading {}: {}", path.display(), e)))?;
        Self::from_yaml(&source)
    }
}

#[async_trait]
impl CentralDirectory for InMemoryDirectory {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn linked_businesses(&self, user_id: Uuid) -> Result<Vec<Business>, DirectoryError> {
        let ids = self.links.get(&user_id).map(Vec::as_slice).unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.businesses.get(id))
            .map(|entry| entry.business.clone())
            .collect())
    }

    async fn all_businesses(&self) -> Result<Vec<Business>, DirectoryError> {
        Ok(self.businesses.values().map(|entry| entry.business.clone()).collect())
    }

    async fn reseller_businesses(&self, reseller_id: ResellerId) -> Result<Vec<Business>, DirectoryError> {
        Ok(self
            .businesses
            .values()
            .filter(|entry| entry.business.reseller_id == Some(reseller_id))
            .map(|entry| entry.business.clone())
            .collect())
    }

    async fn load_business(&self, business_id: BusinessId) -> Result<Option<BusinessRecord>, DirectoryError> {
        let Some(entry) = self.businesses.get(&business_id) else {
            return Ok(None);
        };

        let package_modules = entry
            .subscription
            .as_ref()
            .and_then(|subscription| self.packages.get(&subscription.package_id))
            .map(|codes| codes.iter().filter_map(|code| self.modules.get(code).cloned()).collect())
            .unwrap_or_default();

        Ok(Some(BusinessRecord {
            business: entry.business.clone(),
            subscription: entry.subscription.clone(),
            package_modules,
        }))
    }

    async fn find_module(&self, code: &str) -> Result<Option<Module>, DirectoryError> {
        Ok(self.modules.get(code).cloned())
    }
}

#[async_trait]
impl TenantDirectory for InMemoryDirectory {
    async fn find_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>, DirectoryError> {
        Ok(self.tenants.get(tenant_id).map(|(tenant, _)| tenant.clone()))
    }
}

#[async_trait]
impl TenantConnector for InMemoryDirectory {
    async fn connect(&self, tenant: &Tenant) -> Result<TenantDatabase, DatabaseError> {
        self.tenants
            .get(&tenant.id)
            .map(|(_, data)| TenantDatabase::Memory(data.clone()))
            .ok_or_else(|| DatabaseError::NotFound(format!("tenant database {}", tenant.database)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
users:
  - id: 00000000-0000-0000-0000-000000000001
    name: Ada
    email: ada@example.com
    password: secret
    user_type: business_user
    businesses: [1]
businesses:
  - id: 1
    name: Acme
    tenant_id: acme
    subscription_status: active
    subscription: { id: 10, package_id: 5 }
packages:
  - id: 5
    name: Starter
    modules: [hr, crm]
modules:
  - { id: 1, code: hr, name: HR, status: active }
  - { id: 2, code: crm, name: CRM, status: inactive }
tenants:
  - id: acme
    database: tenant_acme
"#;

    #[tokio::test]
    async fn loads_package_modules_for_business() {
        let directory = InMemoryDirectory::from_yaml(FIXTURE).unwrap();
        let record = directory.load_business(1).await.unwrap().unwrap();

        assert_eq!(record.business.tenant_id.as_deref(), Some("acme"));
        let codes: Vec<_> = record.package_modules.iter().map(|m| m.code.as_str()).collect();
        assert_eq!(codes, vec!["hr", "crm"]);
    }

    #[tokio::test]
    async fn finds_users_case_insensitively() {
        let directory = InMemoryDirectory::from_yaml(FIXTURE).unwrap();
        let user = directory.find_user_by_email("ADA@example.com").await.unwrap().unwrap();
        assert_eq!(user.user_type, UserType::BusinessUser);
        assert_ne!(user.password_hash, "secret");
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_found() {
        let directory = InMemoryDirectory::from_yaml(FIXTURE).unwrap();
        assert!(directory.find_tenant("ghost").await.unwrap().is_none());
        assert!(directory.find_tenant("acme").await.unwrap().is_some());
    }
}
