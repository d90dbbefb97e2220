// handlers/public/system.rs - Landing and health endpoints

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::state::{AppState, CentralBackend};

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Tenant Gate",
            "version": version,
            "description": "Multi-tenant access core: business selection, access types and module admission",
            "endpoints": {
                "login": "POST /login (public)",
                "logout": "POST /logout",
                "business_selection": "GET /business-selection, POST /business-selection/:business_id",
                "business_switch": "POST /business/switch",
                "access_selection": "GET|POST /access-selection",
                "admin": "/admin/dashboard (admin access)",
                "reseller": "/reseller/dashboard (reseller access)",
                "modules": "/modules/:module/dashboard, /hr/employees, /crm/contacts, /inventory/items, /core/settings (module access)",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    if state.central == CentralBackend::Fixture {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "fixture" }
            })),
        );
    }

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
