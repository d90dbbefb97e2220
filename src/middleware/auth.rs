use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::response::{ClientKind, Denial};
use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;
use crate::identity::Identity;
use crate::session::AccessSession;
use crate::state::AppState;

/// Authenticated user context extracted from the session token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub identity: Arc<Identity>,
    pub claims: Claims,
}

/// Attaches `AuthUser` and the session's `AccessSession` when the request
/// carries a valid Bearer token.
///
/// A missing or invalid token is not rejected here; gatekeepers and handlers
/// decide how an anonymous request is answered.
pub async fn authenticate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_jwt_from_headers(request.headers()) {
        Some(token) => token,
        None => return next.run(request).await,
    };

    let claims = match validate_jwt(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Ignoring session token: {}", e);
            return next.run(request).await;
        }
    };

    match load_identity(&state, &claims).await {
        Ok(Some(identity)) => {
            let now = chrono::Utc::now().timestamp();
            let session = match AccessSession::resume(state.sessions.clone(), claims.sid.clone(), now).await {
                Ok(Some(session)) => session,
                Ok(None) => {
                    tracing::debug!("Session {} has ended; treating request as anonymous", claims.sid);
                    return next.run(request).await;
                }
                Err(e) => return ApiError::from(e).into_response(),
            };
            request.extensions_mut().insert(AuthUser {
                identity: Arc::new(identity),
                claims,
            });
            request.extensions_mut().insert(session);
        }
        Ok(None) => {
            tracing::warn!("Session token for unknown or inactive user {}", claims.sub);
        }
        Err(e) => return e.into_response(),
    }

    next.run(request).await
}

async fn load_identity(state: &AppState, claims: &Claims) -> Result<Option<Identity>, ApiError> {
    let Some(user) = state.directory.find_user(claims.sub).await? else {
        return Ok(None);
    };
    if !user.is_active {
        return Ok(None);
    }

    let businesses = state.directory.linked_businesses(user.id).await?;
    Ok(Some(Identity::new(user, businesses)))
}

/// Extract the Bearer token from the Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get("authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Denial;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| Denial::login(ClientKind::from_headers(&parts.headers)))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AccessSession
where
    S: Send + Sync,
{
    type Rejection = Denial;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessSession>()
            .cloned()
            .ok_or_else(|| Denial::login(ClientKind::from_headers(&parts.headers)))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientKind
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientKind::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_tokens_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_jwt_from_headers(&headers).as_deref(), Some("abc.def"));
    }
}
