use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::response::ClientKind;
use crate::access::RedirectTarget;
use crate::error::ApiError;
use crate::session::AccessSession;
use crate::state::AppState;
use crate::tenancy::TenancyScope;

/// Binds the request to the active business's tenant for the rest of the
/// chain and reverts the binding once the handler is done.
pub async fn tenancy_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let client = ClientKind::from_headers(request.headers());

    let scope = request
        .extensions()
        .get::<Arc<TenancyScope>>()
        .cloned()
        .unwrap_or_else(TenancyScope::new);
    request.extensions_mut().insert(scope.clone());

    let identity = request.extensions().get::<AuthUser>().map(|auth| auth.identity.clone());
    let session = request.extensions().get::<AccessSession>().cloned();

    let initialized = state
        .tenancy
        .ensure_initialized(&scope, identity.as_deref(), session.as_ref().map(AccessSession::context))
        .await;

    let guard = match initialized {
        Ok(guard) => guard,
        Err(err) => {
            tracing::warn!("Tenancy initialization failed: {}", err);
            let message = err.to_string();
            return match client {
                ClientKind::Json => ApiError::from(err).into_response(),
                ClientKind::Browser => {
                    if let Some(session) = &session {
                        if let Err(e) = session.flash_error(&message).await {
                            tracing::error!("Failed to flash tenancy error: {}", e);
                        }
                    }
                    Redirect::to(&RedirectTarget::BusinessSelection.path()).into_response()
                }
            };
        }
    };

    if let Some(binding) = scope.current() {
        request.extensions_mut().insert(binding);
    }

    let response = next.run(request).await;
    drop(guard);
    response
}
