//! Test helpers shared by unit and router tests.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::directory::{CentralDirectory, InMemoryDirectory};
use crate::identity::Identity;
use crate::routes::app;
use crate::session::{AccessSession, MemorySessionStore};
use crate::state::{AppState, CentralBackend};

pub const FIXTURE: &str = include_str!("../../fixtures/demo.yaml");

pub fn directory() -> InMemoryDirectory {
    InMemoryDirectory::from_yaml(FIXTURE).expect("demo fixture parses")
}

pub async fn identity_for(directory: &InMemoryDirectory, email: &str) -> Identity {
    let user = directory
        .find_user_by_email(email)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("fixture user {}", email));
    let businesses = directory.linked_businesses(user.id).await.unwrap();
    Identity::new(user, businesses)
}

pub fn session() -> AccessSession {
    AccessSession::new(Arc::new(MemorySessionStore::new()), Uuid::new_v4().to_string())
}

/// A router over the demo fixture plus a handle on its session store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let directory = Arc::new(directory());
        let state = AppState::new(
            CentralBackend::Fixture,
            directory.clone(),
            directory.clone(),
            directory,
            Arc::new(MemorySessionStore::new()),
            "perm.",
            Duration::from_secs(300),
        );
        Self { router: app(state.clone()), state }
    }

    /// Opens a session for `email` without going through `/login`.
    pub async fn session_for(&self, email: &str) -> (String, AccessSession) {
        let directory = directory();
        let identity = identity_for(&directory, email).await;
        let session_id = Uuid::new_v4().to_string();
        let claims = Claims::new(identity.id(), session_id.clone(), identity.primary_type());
        let token = generate_jwt(&claims).unwrap();
        let session = AccessSession::start(self.state.sessions.clone(), session_id, claims.exp)
            .await
            .unwrap();
        (token, session)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ACCEPT, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn browser_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header(header::ACCEPT, "text/html");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}
