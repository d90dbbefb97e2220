// handlers/protected/dashboards.rs - Admin, reseller and no-access pages

use axum::extract::State;
use serde_json::json;

use crate::access::AccessType;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

pub async fn admin_dashboard(auth: AuthUser) -> ApiResult<serde_json::Value> {
    Ok(ApiResponse::success(json!({
        "access_type": AccessType::Admin,
        "user": auth.identity.user(),
    })))
}

/// Reseller landing page: the businesses owned by the user's reseller.
pub async fn reseller_dashboard(State(state): State<AppState>, auth: AuthUser) -> ApiResult<serde_json::Value> {
    let businesses = match auth.identity.user().reseller_id {
        Some(reseller_id) => state.directory.reseller_businesses(reseller_id).await?,
        None => Vec::new(),
    };

    Ok(ApiResponse::success(json!({
        "access_type": AccessType::Reseller,
        "user": auth.identity.user(),
        "businesses": businesses,
    })))
}

/// Terminal page for accounts without any business. Reachable without a session.
pub async fn no_access(auth: Option<AuthUser>) -> ApiResult<serde_json::Value> {
    Ok(ApiResponse::success(json!({
        "user": auth.as_ref().map(|auth| auth.identity.user()),
        "message": "Your account is not linked to any business",
    })))
}
