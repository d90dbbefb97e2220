use axum::{extract::Request, middleware::Next, response::Response};

use super::auth::AuthUser;
use super::response::{ClientKind, Denial};
use crate::access::{AccessType, RedirectTarget};
use crate::database::models::UserType;
use crate::error::ApiError;
use crate::identity::Capabilities;
use crate::session::AccessSession;

/// Admits reseller routes for identities with reseller capability.
///
/// A session not in reseller access is repaired only when the account's
/// primary type is `reseller`; reseller staff are sent back to access
/// selection instead. The asymmetry is intentional and must stay.
pub async fn reseller_gate(mut request: Request, next: Next) -> Result<Response, Denial> {
    let client = ClientKind::from_headers(request.headers());

    let (Some(auth), Some(mut session)) = (
        request.extensions().get::<AuthUser>().cloned(),
        request.extensions().get::<AccessSession>().cloned(),
    ) else {
        return Err(Denial::login(client));
    };

    if !auth.identity.has_reseller_access() {
        tracing::warn!("Reseller route refused for user {}", auth.identity.id());
        return Err(Denial::reselect(client, "Reseller access required"));
    }

    if session.access_type() != Some(AccessType::Reseller) {
        if auth.identity.primary_type() != UserType::Reseller {
            tracing::warn!(
                "Reseller route refused for user {}: session access type is {:?}",
                auth.identity.id(),
                session.access_type()
            );
            return Err(Denial::reselect(client, "Select reseller access first"));
        }

        session
            .set_access_type(AccessType::Reseller)
            .await
            .map_err(|e| Denial::new(client, ApiError::from(e), RedirectTarget::AccessSelection))?;
        tracing::info!("Restored reseller access type for session {}", session.id());
        request.extensions_mut().insert(session);
    }

    Ok(next.run(request).await)
}
