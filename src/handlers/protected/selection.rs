// handlers/protected/selection.rs - Business and access-type selection
//
// GET  /business-selection                  list selectable businesses
// POST /business-selection/:business_id     make a business active
// POST /business/switch                     drop the active business
// GET  /access-selection                    list available access types
// POST /access-selection                    choose admin, reseller or a module
// POST /logout                              end the session

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use serde_json::json;

use crate::access::{self, AccessChoice, AccessError, RedirectTarget};
use crate::database::models::BusinessId;
use crate::error::ApiError;
use crate::middleware::{navigate, ApiResponse, ApiResult, AuthUser, ClientKind, Denial};
use crate::session::AccessSession;
use crate::state::AppState;

/// Refuses a selection. Browsers see the reason as a flash message on the
/// page they are sent back to.
async fn refuse(client: ClientKind, session: &AccessSession, err: AccessError, back_to: RedirectTarget) -> Denial {
    let error = ApiError::from(err);
    if client == ClientKind::Browser {
        if let Err(e) = session.flash_error(error.message()).await {
            tracing::error!("Failed to flash selection error: {}", e);
        }
    }
    Denial::new(client, error, back_to)
}

pub async fn business_selection_get(
    State(state): State<AppState>,
    auth: AuthUser,
    session: AccessSession,
) -> ApiResult<serde_json::Value> {
    let flash_error = session.take_flash_error().await?;
    let businesses = access::selectable_businesses(state.directory.as_ref(), &auth.identity).await?;

    Ok(ApiResponse::success(json!({
        "businesses": businesses,
        "active_business_id": session.active_business().map(|business| business.id),
        "flash_error": flash_error,
    })))
}

/**
 * POST /business-selection/:business_id - Make a business active
 *
 * Clears any previously chosen access type and module. Unknown business ids
 * and businesses of other accounts are refused identically.
 */
pub async fn business_select_post(
    State(state): State<AppState>,
    auth: AuthUser,
    mut session: AccessSession,
    client: ClientKind,
    Path(business_id): Path<BusinessId>,
) -> Result<Response, Denial> {
    match access::select_business(state.directory.as_ref(), &auth.identity, &mut session, business_id).await {
        Ok(business) => {
            tracing::info!("User {} selected business {}", auth.identity.id(), business.id);
            Ok(navigate(client, RedirectTarget::AccessSelection, json!({ "business": business })))
        }
        Err(err) => Err(refuse(client, &session, err, RedirectTarget::BusinessSelection).await),
    }
}

pub async fn business_switch_post(auth: AuthUser, mut session: AccessSession, client: ClientKind) -> Result<Response, ApiError> {
    let target = access::switch_business(&mut session).await?;
    tracing::info!("User {} switched away from their business", auth.identity.id());
    Ok(navigate(client, target, json!({})))
}

pub async fn access_selection_get(auth: AuthUser, session: AccessSession) -> ApiResult<serde_json::Value> {
    let flash_error = session.take_flash_error().await?;
    let options = access::available_access(&auth.identity, &session);

    Ok(ApiResponse::success(json!({
        "options": options,
        "access_type": session.access_type(),
        "module_code": session.module_code(),
        "flash_error": flash_error,
    })))
}

/**
 * POST /access-selection - Choose how the session works with the business
 *
 * Expected Input:
 * ```json
 * { "access_type": "module", "module_code": "hr" }
 * { "access_type": "admin" }
 * ```
 *
 * A module must be entitled to the active business and permitted for the
 * user. On success the client is sent to the chosen dashboard.
 */
pub async fn access_selection_post(
    auth: AuthUser,
    mut session: AccessSession,
    client: ClientKind,
    Json(choice): Json<AccessChoice>,
) -> Result<Response, Denial> {
    match access::select_access(&auth.identity, &mut session, choice).await {
        Ok(target) => {
            tracing::info!(
                "User {} chose {:?} access (module {:?})",
                auth.identity.id(),
                session.access_type(),
                session.module_code()
            );
            Ok(navigate(
                client,
                target,
                json!({
                    "access_type": session.access_type(),
                    "module_code": session.module_code(),
                }),
            ))
        }
        Err(err) => Err(refuse(client, &session, err, RedirectTarget::AccessSelection).await),
    }
}

pub async fn logout_post(auth: AuthUser, mut session: AccessSession, client: ClientKind) -> Result<Response, ApiError> {
    let target = access::logout(&mut session).await?;
    tracing::info!("User {} logged out", auth.identity.id());
    Ok(navigate(client, target, json!({})))
}
