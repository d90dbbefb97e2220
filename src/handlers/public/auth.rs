// handlers/public/auth.rs - POST /login handler

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::access::resolve_initial_access;
use crate::auth::{generate_jwt, verify_password, Claims};
use crate::config;
use crate::error::ApiError;
use crate::identity::Identity;
use crate::middleware::{ApiResponse, ApiResult};
use crate::session::AccessSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/**
 * POST /login - Authenticate and open a new access session
 *
 * Expected Input:
 * ```json
 * { "email": "staff@example.com", "password": "secret" }
 * ```
 *
 * Expected Output (Success):
 * ```json
 * {
 *   "success": true,
 *   "data": {
 *     "token": "eyJhbGciOiJIUzI1NiI...",
 *     "user": { "id": "...", "name": "...", "email": "...", "user_type": "business_user" },
 *     "expires_in": 86400,
 *     "redirect": { "route": "access.selection", "path": "/access-selection" }
 *   }
 * }
 * ```
 *
 * The redirect is the outcome of initial access resolution for the new
 * session. Unknown emails, wrong passwords and inactive accounts all answer
 * with the same 401.
 */
pub async fn login_post(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<serde_json::Value> {
    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let user = match state.directory.find_user_by_email(email).await? {
        Some(user) if user.is_active && verify_password(&request.password, &user.password_hash) => user,
        _ => {
            tracing::warn!("Failed login attempt for {}", email);
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    let businesses = state.directory.linked_businesses(user.id).await?;
    let identity = Identity::new(user, businesses);

    let session_id = Uuid::new_v4().to_string();
    let claims = Claims::new(identity.id(), session_id.clone(), identity.primary_type());
    let token = generate_jwt(&claims)?;

    let mut session = AccessSession::start(state.sessions.clone(), session_id, claims.exp).await?;
    let redirect = resolve_initial_access(state.directory.as_ref(), &identity, &mut session).await?;

    tracing::info!(
        "User {} logged in, routed to {}",
        identity.id(),
        redirect.route_name()
    );

    let expires_in = config::config().security.jwt_expiry_hours * 3600;
    Ok(ApiResponse::success(json!({
        "token": token,
        "user": identity.user(),
        "expires_in": expires_in,
        "redirect": redirect,
    })))
}
