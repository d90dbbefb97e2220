use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Tenant registry row: maps a business's `tenant_id` to its isolated database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub database: String,
}

/// Tenant-side rows held in memory when no Postgres server backs the tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantData {
    #[serde(default)]
    pub permissions: HashMap<Uuid, Vec<String>>,
}
