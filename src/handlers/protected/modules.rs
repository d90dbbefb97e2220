// handlers/protected/modules.rs - Module dashboards and sections
//
// Every handler here runs after the module gatekeeper admitted the request
// and inside the tenant binding of the active business.

use axum::extract::{MatchedPath, State};
use axum::Extension;
use serde_json::json;

use crate::access::routes::route_by_path;
use crate::middleware::{ActiveModule, ApiResponse, ApiResult, AuthUser};
use crate::session::AccessSession;
use crate::state::AppState;
use crate::tenancy::TenantBinding;

/// GET /modules/:module/dashboard
pub async fn module_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
    session: AccessSession,
    Extension(ActiveModule(module)): Extension<ActiveModule>,
    Extension(binding): Extension<TenantBinding>,
) -> ApiResult<serde_json::Value> {
    let permissions = state.permissions.permissions_for(&binding, auth.identity.id()).await?;

    Ok(ApiResponse::success(json!({
        "module": module,
        "business": session.active_business(),
        "tenant": binding.tenant_id(),
        "permissions": permissions,
    })))
}

/// Module-declared pages such as `/hr/employees`.
pub async fn module_section(
    State(state): State<AppState>,
    auth: AuthUser,
    matched: MatchedPath,
    Extension(ActiveModule(module)): Extension<ActiveModule>,
    Extension(binding): Extension<TenantBinding>,
) -> ApiResult<serde_json::Value> {
    let permissions = state.permissions.permissions_for(&binding, auth.identity.id()).await?;
    let section = route_by_path(matched.as_str()).map(|route| route.name);

    Ok(ApiResponse::success(json!({
        "module": module,
        "section": section,
        "tenant": binding.tenant_id(),
        "database": binding.database_name(),
        "permissions": permissions,
    })))
}
