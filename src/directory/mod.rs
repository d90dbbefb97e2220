//! Central registry lookups: users, businesses, modules and the tenant directory.
//!
//! The access core only talks to these traits. `PgDirectory` backs them with the
//! central Postgres database, `InMemoryDirectory` with a YAML fixture.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Business, BusinessId, BusinessRecord, Module, ResellerId, Tenant, User};

pub mod memory;

pub use memory::{Fixture, InMemoryDirectory};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory query failed: {0}")]
    Query(String),

    #[error("Malformed directory row: {0}")]
    Malformed(String),

    #[error(transparent)]
    Database(#[from] crate::database::DatabaseError),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        DirectoryError::Query(err.to_string())
    }
}

/// Users, businesses, packages and modules of the central database.
#[async_trait]
pub trait CentralDirectory: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, DirectoryError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError>;

    /// Businesses linked to the user through the `business_user` pivot.
    async fn linked_businesses(&self, user_id: Uuid) -> Result<Vec<Business>, DirectoryError>;

    /// Every business that is not deleted.
    async fn all_businesses(&self) -> Result<Vec<Business>, DirectoryError>;

    /// Businesses owned by a reseller.
    async fn reseller_businesses(&self, reseller_id: ResellerId) -> Result<Vec<Business>, DirectoryError>;

    /// The business with its latest subscription and that subscription's package modules.
    async fn load_business(&self, business_id: BusinessId) -> Result<Option<BusinessRecord>, DirectoryError>;

    async fn find_module(&self, code: &str) -> Result<Option<Module>, DirectoryError>;
}

/// `findTenant(tenantId) -> TenantRecord | not-found`
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn find_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>, DirectoryError>;
}
