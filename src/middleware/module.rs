use axum::{
    extract::{MatchedPath, Path, Request, State},
    middleware::Next,
    response::Response,
    RequestExt,
};
use chrono::Utc;
use std::collections::HashMap;

use super::auth::AuthUser;
use super::response::{ClientKind, Denial};
use crate::access::routes::{requested_module, route_by_path};
use crate::access::{entitled_modules, AccessType, ActiveBusiness};
use crate::database::models::Module;
use crate::identity::Capabilities;
use crate::session::AccessSession;
use crate::state::AppState;

/// Module resolved by the module gatekeeper for the current request.
#[derive(Clone, Debug)]
pub struct ActiveModule(pub Module);

/// Admits module routes.
///
/// The module named by the route must be the session's active module and be
/// entitled to the active business as the directory records it now, not as it
/// was when the business was selected. Every refusal past authentication sends
/// the user back to access selection, so callers cannot tell an unknown
/// module from a forbidden one.
pub async fn module_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Denial> {
    let client = ClientKind::from_headers(request.headers());

    let (Some(auth), Some(session)) = (
        request.extensions().get::<AuthUser>().cloned(),
        request.extensions().get::<AccessSession>().cloned(),
    ) else {
        return Err(Denial::login(client));
    };
    let Some(business) = session.active_business() else {
        return Err(Denial::login(client));
    };

    if session.access_type() != Some(AccessType::Module) {
        return Err(Denial::reselect(client, "Select a module first"));
    }

    let route_param = request
        .extract_parts::<Path<HashMap<String, String>>>()
        .await
        .ok()
        .and_then(|Path(params)| params.get("module").cloned());
    let route_name = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|path| route_by_path(path.as_str()))
        .map(|route| route.name);

    let Some(requested) = requested_module(route_param.as_deref(), route_name) else {
        tracing::warn!("Module route without module code: {:?}", route_name);
        return Err(Denial::reselect(client, "Module access denied"));
    };

    if session.module_code() != Some(requested.as_str()) {
        tracing::warn!(
            "User {} requested module '{}' while '{}' is active",
            auth.identity.id(),
            requested,
            session.module_code().unwrap_or("-")
        );
        return Err(Denial::reselect(client, "Module access denied"));
    }

    let module = match state.directory.find_module(&requested).await {
        Ok(Some(module)) => module,
        Ok(None) => {
            tracing::warn!("Unknown module '{}' requested by user {}", requested, auth.identity.id());
            return Err(Denial::reselect(client, "Module access denied"));
        }
        Err(e) => {
            tracing::error!("Module lookup for '{}' failed: {}", requested, e);
            return Err(Denial::reselect(client, "Module access denied"));
        }
    };

    let current = match state.directory.load_business(business.id).await {
        Ok(Some(record)) => ActiveBusiness::new(&record.business, entitled_modules(&record, Utc::now())),
        Ok(None) => {
            tracing::warn!("Active business {} no longer exists", business.id);
            return Err(Denial::reselect(client, "Module access denied"));
        }
        Err(e) => {
            tracing::error!("Business lookup for {} failed: {}", business.id, e);
            return Err(Denial::reselect(client, "Module access denied"));
        }
    };

    if !module.is_grantable() || !auth.identity.can_access_module(&current, &module.code) {
        tracing::warn!(
            "Module '{}' not entitled to business {} for user {}",
            module.code,
            business.id,
            auth.identity.id()
        );
        return Err(Denial::reselect(client, "Module access denied"));
    }

    tracing::debug!("Module '{}' admitted for business {}", module.code, business.id);
    request.extensions_mut().insert(ActiveModule(module));

    Ok(next.run(request).await)
}
