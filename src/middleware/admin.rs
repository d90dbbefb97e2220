use axum::{extract::Request, middleware::Next, response::Response};

use super::auth::AuthUser;
use super::response::{ClientKind, Denial};
use crate::access::AccessType;
use crate::identity::Capabilities;
use crate::session::AccessSession;

/// Admits admin routes only for admins whose session is in admin access.
pub async fn admin_gate(request: Request, next: Next) -> Result<Response, Denial> {
    let client = ClientKind::from_headers(request.headers());

    let Some(auth) = request.extensions().get::<AuthUser>() else {
        return Err(Denial::login(client));
    };

    let access_type = request
        .extensions()
        .get::<AccessSession>()
        .and_then(AccessSession::access_type);

    if !auth.identity.has_admin_access() || access_type != Some(AccessType::Admin) {
        tracing::warn!(
            "Admin route refused for user {} (access type {:?})",
            auth.identity.id(),
            access_type
        );
        return Err(Denial::reselect(client, "Admin access required"));
    }

    Ok(next.run(request).await)
}
