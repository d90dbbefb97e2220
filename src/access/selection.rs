use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccessError, AccessType, ActiveBusiness, EntitledModule, RedirectTarget};
use crate::database::models::{Business, BusinessId, BusinessRecord, UserType};
use crate::directory::{CentralDirectory, DirectoryError};
use crate::identity::{Capabilities, Identity};
use crate::session::{AccessSession, SessionError};

/// Body of `POST /access-selection`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "access_type", rename_all = "lowercase")]
pub enum AccessChoice {
    Admin,
    Reseller,
    Module { module_code: String },
}

/// What the access-selection page offers the current session.
#[derive(Debug, Clone, Serialize)]
pub struct AccessOptions {
    pub admin: bool,
    pub reseller: bool,
    pub business: Option<ActiveBusiness>,
    pub modules: Vec<EntitledModule>,
}

/// Modules granted by the business's active subscription.
///
/// The subscription counts only while the business is active or on trial and
/// the subscription has started and not ended. Inactive and deprecated modules
/// never count.
pub fn entitled_modules(record: &BusinessRecord, now: DateTime<Utc>) -> Vec<EntitledModule> {
    if !record.business.subscription_status.is_operational() {
        return Vec::new();
    }
    match &record.subscription {
        Some(subscription) if subscription.is_current(now) => record
            .package_modules
            .iter()
            .filter(|module| module.is_grantable())
            .map(EntitledModule::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Businesses the identity may pick on the business-selection page.
///
/// System admins see every business and primary resellers the businesses
/// their reseller owns. Everyone else sees the businesses linked to them.
pub async fn selectable_businesses(
    directory: &dyn CentralDirectory,
    identity: &Identity,
) -> Result<Vec<Business>, DirectoryError> {
    match identity.primary_type() {
        UserType::SystemAdmin => directory.all_businesses().await,
        UserType::Reseller => match identity.user().reseller_id {
            Some(reseller_id) => directory.reseller_businesses(reseller_id).await,
            None => Ok(Vec::new()),
        },
        UserType::BusinessUser | UserType::Investor => Ok(identity.businesses().to_vec()),
    }
}

/// Makes `business_id` the session's active business.
///
/// Fails with `BusinessNotLinked` for any business the identity may not
/// operate, whether or not it exists. Always clears access type and module code.
pub async fn select_business(
    directory: &dyn CentralDirectory,
    identity: &Identity,
    session: &mut AccessSession,
    business_id: BusinessId,
) -> Result<ActiveBusiness, AccessError> {
    let record = match directory.load_business(business_id).await? {
        Some(record) if identity.can_operate_business(&record.business) => record,
        Some(_) => {
            tracing::warn!("User {} tried to select unlinked business {}", identity.id(), business_id);
            return Err(AccessError::BusinessNotLinked(business_id));
        }
        None if identity.linked_business(business_id).is_some() => {
            return Err(AccessError::BusinessNotFound(business_id));
        }
        None => {
            tracing::warn!("User {} tried to select unknown business {}", identity.id(), business_id);
            return Err(AccessError::BusinessNotLinked(business_id));
        }
    };

    let modules = entitled_modules(&record, Utc::now());
    let active = ActiveBusiness::new(&record.business, modules);

    session.set_active_business(active.clone()).await?;
    session.clear_access().await?;

    tracing::debug!(
        "User {} selected business {} with {} entitled modules",
        identity.id(),
        business_id,
        active.modules.len()
    );
    Ok(active)
}

/// Sets the session's access type.
pub async fn select_access(
    identity: &Identity,
    session: &mut AccessSession,
    choice: AccessChoice,
) -> Result<RedirectTarget, AccessError> {
    match choice {
        AccessChoice::Admin => {
            if !identity.has_admin_access() {
                return Err(AccessError::AccessTypeUnavailable(AccessType::Admin));
            }
            session.set_access(AccessType::Admin, None).await?;
            Ok(RedirectTarget::AdminDashboard)
        }
        AccessChoice::Reseller => {
            if !identity.has_reseller_access() {
                return Err(AccessError::AccessTypeUnavailable(AccessType::Reseller));
            }
            session.set_access(AccessType::Reseller, None).await?;
            Ok(RedirectTarget::ResellerDashboard)
        }
        AccessChoice::Module { module_code } => {
            let business = session.active_business().ok_or(AccessError::NoActiveBusiness)?;

            let listed = session
                .context()
                .available_modules
                .iter()
                .any(|module| module.code == module_code);
            if !listed || !identity.can_access_module(business, &module_code) {
                return Err(AccessError::ModuleNotEntitled(module_code));
            }

            session.set_access(AccessType::Module, Some(module_code.clone())).await?;
            Ok(RedirectTarget::ModuleDashboard(module_code))
        }
    }
}

pub fn available_access(identity: &Identity, session: &AccessSession) -> AccessOptions {
    let business = session.active_business().cloned();
    let modules = business
        .as_ref()
        .map(|business| {
            session
                .context()
                .available_modules
                .iter()
                .filter(|module| identity.can_access_module(business, &module.code))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    AccessOptions {
        admin: identity.has_admin_access(),
        reseller: identity.has_reseller_access(),
        business,
        modules,
    }
}

/// Drops the business and access selection; the user picks a business again.
pub async fn switch_business(session: &mut AccessSession) -> Result<RedirectTarget, SessionError> {
    session.clear().await?;
    Ok(RedirectTarget::BusinessSelection)
}

/// Ends the session; its token stops authenticating.
pub async fn logout(session: &mut AccessSession) -> Result<RedirectTarget, SessionError> {
    session.end().await?;
    Ok(RedirectTarget::Login)
}
