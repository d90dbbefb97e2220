use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::access::RedirectTarget;
use crate::error::ApiError;

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: None, // Default to 200 OK
        }
    }

    /// Create an API response with custom status code
    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        // Convert data to JSON Value for consistent envelope format
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return ApiError::internal_server_error("Failed to serialize response data").into_response();
            }
        };

        let envelope = json!({
            "success": true,
            "data": data_value
        });

        (status, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// Whether the caller wants machine-readable responses or browser redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    Json,
    Browser,
}

impl ClientKind {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let accepts_json = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("application/json"));
        let is_xhr = headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

        if accepts_json || is_xhr {
            ClientKind::Json
        } else {
            ClientKind::Browser
        }
    }
}

/// A refused request: JSON clients get the error, browsers get redirected.
#[derive(Debug)]
pub struct Denial {
    client: ClientKind,
    error: ApiError,
    redirect: RedirectTarget,
}

impl Denial {
    pub fn new(client: ClientKind, error: ApiError, redirect: RedirectTarget) -> Self {
        Self { client, error, redirect }
    }

    pub fn login(client: ClientKind) -> Self {
        Self::new(client, ApiError::unauthorized("Authentication required"), RedirectTarget::Login)
    }

    pub fn reselect(client: ClientKind, message: impl Into<String>) -> Self {
        Self::new(client, ApiError::forbidden(message), RedirectTarget::AccessSelection)
    }

    pub fn error(&self) -> &ApiError {
        &self.error
    }

    pub fn redirect(&self) -> &RedirectTarget {
        &self.redirect
    }
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        match self.client {
            ClientKind::Json => self.error.into_response(),
            ClientKind::Browser => Redirect::to(&self.redirect.path()).into_response(),
        }
    }
}

/// Moves the client on to `target`, attaching `data` for JSON clients.
pub fn navigate(client: ClientKind, target: RedirectTarget, data: Value) -> Response {
    match client {
        ClientKind::Json => {
            let mut body = data;
            if let Value::Object(map) = &mut body {
                map.insert("redirect".to_string(), json!(target));
            }
            ApiResponse::success(body).into_response()
        }
        ClientKind::Browser => Redirect::to(&target.path()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn detects_json_clients() {
        let mut headers = HeaderMap::new();
        assert_eq!(ClientKind::from_headers(&headers), ClientKind::Browser);

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json, text/plain"));
        assert_eq!(ClientKind::from_headers(&headers), ClientKind::Json);

        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        assert_eq!(ClientKind::from_headers(&headers), ClientKind::Json);
    }

    #[test]
    fn browser_denial_redirects_without_status_leak() {
        let denial = Denial::reselect(ClientKind::Browser, "Module access denied");
        let response = denial.into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/access-selection");
    }

    #[test]
    fn json_denial_is_forbidden() {
        let response = Denial::reselect(ClientKind::Json, "nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
