//! Access context state machine: initial resolution after login, business
//! selection, access-type selection and the route/redirect vocabulary shared
//! by the gatekeepers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::database::models::{Business, BusinessId, Module, ResellerId, SubscriptionStatus};
use crate::directory::DirectoryError;
use crate::session::SessionError;

pub mod resolver;
pub mod routes;
pub mod selection;

pub use resolver::resolve_initial_access;
pub use selection::{
    available_access, entitled_modules, logout, select_access, select_business, selectable_businesses,
    switch_business, AccessChoice, AccessOptions,
};

/// Operating mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Admin,
    Reseller,
    Module,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Admin => "admin",
            AccessType::Reseller => "reseller",
            AccessType::Module => "module",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(AccessType::Admin),
            "reseller" => Ok(AccessType::Reseller),
            "module" => Ok(AccessType::Module),
            other => Err(format!("unknown access type '{}'", other)),
        }
    }
}

/// Module as cached in the session's entitlement list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitledModule {
    pub id: i64,
    pub code: String,
    pub name: String,
}

impl From<&Module> for EntitledModule {
    fn from(module: &Module) -> Self {
        Self {
            id: module.id,
            code: module.code.clone(),
            name: module.name.clone(),
        }
    }
}

/// The business a session operates under, with the modules its active
/// subscription grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveBusiness {
    pub id: BusinessId,
    pub name: String,
    pub tenant_id: Option<String>,
    pub reseller_id: Option<ResellerId>,
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub modules: Vec<EntitledModule>,
}

impl ActiveBusiness {
    pub fn new(business: &Business, modules: Vec<EntitledModule>) -> Self {
        Self {
            id: business.id,
            name: business.name.clone(),
            tenant_id: business.tenant_id.clone(),
            reseller_id: business.reseller_id,
            subscription_status: business.subscription_status,
            modules,
        }
    }

    pub fn is_entitled(&self, module_code: &str) -> bool {
        self.modules.iter().any(|module| module.code == module_code)
    }
}

/// Where the user is sent next. Each target is a named route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    Login,
    NoAccess,
    BusinessSelection,
    AccessSelection,
    AdminDashboard,
    ResellerDashboard,
    ModuleDashboard(String),
}

impl RedirectTarget {
    pub fn route_name(&self) -> &'static str {
        match self {
            RedirectTarget::Login => "login",
            RedirectTarget::NoAccess => "no.access",
            RedirectTarget::BusinessSelection => "business.selection",
            RedirectTarget::AccessSelection => "access.selection",
            RedirectTarget::AdminDashboard => "admin.dashboard",
            RedirectTarget::ResellerDashboard => "reseller.dashboard",
            RedirectTarget::ModuleDashboard(_) => "modules.dashboard",
        }
    }

    pub fn path(&self) -> String {
        match self {
            RedirectTarget::Login => "/login".to_string(),
            RedirectTarget::NoAccess => "/no-access".to_string(),
            RedirectTarget::BusinessSelection => "/business-selection".to_string(),
            RedirectTarget::AccessSelection => "/access-selection".to_string(),
            RedirectTarget::AdminDashboard => "/admin/dashboard".to_string(),
            RedirectTarget::ResellerDashboard => "/reseller/dashboard".to_string(),
            RedirectTarget::ModuleDashboard(code) => format!("/modules/{}/dashboard", code),
        }
    }
}

impl Serialize for RedirectTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("RedirectTarget", 2)?;
        state.serialize_field("route", self.route_name())?;
        state.serialize_field("path", &self.path())?;
        state.end()
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Business is not linked to this account")]
    BusinessNotLinked(BusinessId),

    #[error("Business not found")]
    BusinessNotFound(BusinessId),

    #[error("No active business selected")]
    NoActiveBusiness,

    #[error("Access type '{0}' is not available to this account")]
    AccessTypeUnavailable(AccessType),

    #[error("Module '{0}' is not available for the active business")]
    ModuleNotEntitled(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_dashboard_path_carries_code() {
        let target = RedirectTarget::ModuleDashboard("hr".to_string());
        assert_eq!(target.route_name(), "modules.dashboard");
        assert_eq!(target.path(), "/modules/hr/dashboard");
    }

    #[test]
    fn access_type_serializes_lowercase() {
        assert_eq!(serde_json::to_value(AccessType::Module).unwrap(), "module");
        assert_eq!("reseller".parse::<AccessType>().unwrap(), AccessType::Reseller);
        assert!("root".parse::<AccessType>().is_err());
    }
}
