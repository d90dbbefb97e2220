use super::{selection::select_business, AccessError, AccessType, RedirectTarget};
use crate::directory::CentralDirectory;
use crate::identity::{Capabilities, Identity};
use crate::session::AccessSession;

/// Picks the first access type of a freshly authenticated session.
///
/// Reseller capability wins over admin capability; everyone else is routed by
/// the number of linked businesses. A single business becomes the active one
/// but the access type is left for the access-selection step.
pub async fn resolve_initial_access(
    directory: &dyn CentralDirectory,
    identity: &Identity,
    session: &mut AccessSession,
) -> Result<RedirectTarget, AccessError> {
    if identity.has_reseller_access() {
        session.set_access_type(AccessType::Reseller).await?;
        tracing::debug!("User {} resolved to reseller access", identity.id());
        return Ok(RedirectTarget::ResellerDashboard);
    }

    if identity.has_admin_access() {
        session.set_access_type(AccessType::Admin).await?;
        tracing::debug!("User {} resolved to admin access", identity.id());
        return Ok(RedirectTarget::AdminDashboard);
    }

    match identity.businesses() {
        [] => {
            tracing::debug!("User {} has no linked businesses", identity.id());
            Ok(RedirectTarget::NoAccess)
        }
        [only] => {
            select_business(directory, identity, session, only.id).await?;
            Ok(RedirectTarget::AccessSelection)
        }
        _ => Ok(RedirectTarget::BusinessSelection),
    }
}
