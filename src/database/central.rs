//! Central database implementation of the directory traits.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    Business, BusinessId, BusinessRecord, Module, ResellerId, Subscription, Tenant, User,
};
use crate::directory::{CentralDirectory, DirectoryError, TenantDirectory};

pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect() -> Result<Self, DatabaseError> {
        Ok(Self::new(DatabaseManager::central_pool().await?))
    }
}

fn parse<T: FromStr<Err = String>>(row: &PgRow, column: &str) -> Result<T, DirectoryError> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(DirectoryError::Malformed)
}

fn user_from_row(row: &PgRow) -> Result<User, DirectoryError> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        user_type: parse(row, "user_type")?,
        reseller_id: row.try_get("reseller_id")?,
        password_hash: row.try_get("password_hash")?,
        is_active: row.try_get("is_active")?,
    })
}

fn business_from_row(row: &PgRow) -> Result<Business, DirectoryError> {
    Ok(Business {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        tenant_id: row.try_get("tenant_id")?,
        reseller_id: row.try_get("reseller_id")?,
        subscription_status: parse(row, "subscription_status")?,
    })
}

fn module_from_row(row: &PgRow) -> Result<Module, DirectoryError> {
    Ok(Module {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        status: parse(row, "status")?,
    })
}

const USER_COLUMNS: &str = "id, name, email, user_type, reseller_id, password_hash, is_active";
const BUSINESS_COLUMNS: &str = "b.id, b.name, b.tenant_id, b.reseller_id, b.subscription_status";

#[async_trait]
impl CentralDirectory for PgDirectory {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, DirectoryError> {
        let query = format!("SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL", USER_COLUMNS);
        let row = sqlx::query(&query).bind(user_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        let query = format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1) AND deleted_at IS NULL",
            USER_COLUMNS
        );
        let row = sqlx::query(&query).bind(email).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn linked_businesses(&self, user_id: Uuid) -> Result<Vec<Business>, DirectoryError> {
        let query = format!(
            r#"
            SELECT {}
            FROM businesses b
            JOIN business_user bu ON bu.business_id = b.id
            WHERE bu.user_id = $1
            AND b.deleted_at IS NULL
            ORDER BY b.name
            "#,
            BUSINESS_COLUMNS
        );
        let rows = sqlx::query(&query).bind(user_id).fetch_all(&self.pool).await?;
        rows.iter().map(business_from_row).collect()
    }

    async fn all_businesses(&self) -> Result<Vec<Business>, DirectoryError> {
        let query = format!("SELECT {} FROM businesses b WHERE b.deleted_at IS NULL ORDER BY b.name", BUSINESS_COLUMNS);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(business_from_row).collect()
    }

    async fn reseller_businesses(&self, reseller_id: ResellerId) -> Result<Vec<Business>, DirectoryError> {
        let query = format!(
            "SELECT {} FROM businesses b WHERE b.reseller_id = $1 AND b.deleted_at IS NULL ORDER BY b.name",
            BUSINESS_COLUMNS
        );
        let rows = sqlx::query(&query).bind(reseller_id).fetch_all(&self.pool).await?;
        rows.iter().map(business_from_row).collect()
    }

    async fn load_business(&self, business_id: BusinessId) -> Result<Option<BusinessRecord>, DirectoryError> {
        let query = format!("SELECT {} FROM businesses b WHERE b.id = $1 AND b.deleted_at IS NULL", BUSINESS_COLUMNS);
        let Some(row) = sqlx::query(&query).bind(business_id).fetch_optional(&self.pool).await? else {
            return Ok(None);
        };
        let business = business_from_row(&row)?;

        // Latest started subscription wins; expiry is judged by the caller.
        let subscription = sqlx::query(
            r#"
            SELECT id, package_id, starts_at, ends_at
            FROM subscriptions
            WHERE business_id = $1
            AND starts_at <= now()
            ORDER BY starts_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| -> Result<Subscription, DirectoryError> {
            Ok(Subscription {
                id: row.try_get("id")?,
                package_id: row.try_get("package_id")?,
                starts_at: row.try_get("starts_at")?,
                ends_at: row.try_get("ends_at")?,
            })
        })
        .transpose()?;

        let package_modules = match &subscription {
            Some(subscription) => {
                let rows = sqlx::query(
                    r#"
                    SELECT m.id, m.code, m.name, m.status
                    FROM modules m
                    JOIN package_module pm ON pm.module_id = m.id
                    WHERE pm.package_id = $1
                    ORDER BY m.id
                    "#,
                )
                .bind(subscription.package_id)
                .fetch_all(&self.pool)
                .await?;
                rows.iter().map(module_from_row).collect::<Result<Vec<_>, _>>()?
            }
            None => Vec::new(),
        };

        Ok(Some(BusinessRecord {
            business,
            subscription,
            package_modules,
        }))
    }

    async fn find_module(&self, code: &str) -> Result<Option<Module>, DirectoryError> {
        let row = sqlx::query("SELECT id, code, name, status FROM modules WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(module_from_row).transpose()
    }
}

#[async_trait]
impl TenantDirectory for PgDirectory {
    async fn find_tenant(&self, tenant_id: &str) -> Result<Option<Tenant>, DirectoryError> {
        let row = sqlx::query("SELECT id, database FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<Tenant, DirectoryError> {
            Ok(Tenant {
                id: row.try_get("id")?,
                database: row.try_get("database")?,
            })
        })
        .transpose()
    }
}
