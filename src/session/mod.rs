//! Session-scoped access context.
//!
//! All reads and writes of the session keys go through [`AccessSession`]; nothing
//! else touches the store directly.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::access::{AccessType, ActiveBusiness, EntitledModule};
use crate::database::models::BusinessId;

pub mod memory;

pub use memory::MemorySessionStore;

pub mod keys {
    pub const ACTIVE_BUSINESS: &str = "active_business";
    pub const ACTIVE_BUSINESS_ID: &str = "active_business_id";
    pub const ACTIVE_ACCESS_TYPE: &str = "active_access_type";
    pub const ACTIVE_MODULE_CODE: &str = "active_module_code";
    pub const AVAILABLE_MODULES: &str = "available_modules";
    pub const FLASH_ERROR: &str = "flash_error";
    /// Unix time the session token expires. Written at login; a session
    /// without it is not live.
    pub const EXPIRES_AT: &str = "expires_at";

    /// Keys that make up the access context.
    pub const ACCESS_CONTEXT: &[&str] = &[
        ACTIVE_BUSINESS,
        ACTIVE_BUSINESS_ID,
        ACTIVE_ACCESS_TYPE,
        ACTIVE_MODULE_CODE,
        AVAILABLE_MODULES,
    ];
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session store unavailable: {0}")]
    Store(String),

    #[error("Session value for '{key}' could not be encoded: {message}")]
    Encode { key: String, message: String },
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        SessionError::Store(err.to_string())
    }
}

/// Per-session key/value storage. Last write wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>, SessionError>;

    async fn put(&self, session_id: &str, key: &str, value: Value) -> Result<(), SessionError>;

    async fn forget(&self, session_id: &str, key: &str) -> Result<(), SessionError>;

    /// Drops every key of the session.
    async fn destroy(&self, session_id: &str) -> Result<(), SessionError>;

    /// Drops every session whose `expires_at` is at or before `now` (unix seconds).
    /// Returns the number of sessions removed.
    async fn purge_expired(&self, now: i64) -> Result<usize, SessionError>;
}

/// Typed view of the access-context keys of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccessContext {
    pub active_business: Option<ActiveBusiness>,
    pub active_business_id: Option<BusinessId>,
    pub active_access_type: Option<AccessType>,
    pub active_module_code: Option<String>,
    pub available_modules: Vec<EntitledModule>,
}

/// The access context of one session together with the store it lives in.
#[derive(Clone)]
pub struct AccessSession {
    id: String,
    store: Arc<dyn SessionStore>,
    context: AccessContext,
}

impl std::fmt::Debug for AccessSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessSession")
            .field("id", &self.id)
            .field("context", &self.context)
            .finish()
    }
}

impl AccessSession {
    /// A session with no stored context, as created at login.
    pub fn new(store: Arc<dyn SessionStore>, session_id: impl Into<String>) -> Self {
        Self {
            id: session_id.into(),
            store,
            context: AccessContext::default(),
        }
    }

    /// Opens a live session that expires with its token at `expires_at`.
    pub async fn start(
        store: Arc<dyn SessionStore>,
        session_id: impl Into<String>,
        expires_at: i64,
    ) -> Result<Self, SessionError> {
        let session = Self::new(store, session_id);
        session.write(keys::EXPIRES_AT, &expires_at).await?;
        Ok(session)
    }

    /// Loads a session only while it is live: started and neither ended nor
    /// expired at `now`.
    pub async fn resume(
        store: Arc<dyn SessionStore>,
        session_id: impl Into<String>,
        now: i64,
    ) -> Result<Option<Self>, SessionError> {
        let id = session_id.into();
        let expires_at: Option<i64> = read(store.as_ref(), &id, keys::EXPIRES_AT).await?;
        match expires_at {
            Some(expires_at) if expires_at > now => Self::load(store, id).await.map(Some),
            _ => Ok(None),
        }
    }

    pub async fn load(store: Arc<dyn SessionStore>, session_id: impl Into<String>) -> Result<Self, SessionError> {
        let id = session_id.into();

        let context = AccessContext {
            active_business: read(store.as_ref(), &id, keys::ACTIVE_BUSINESS).await?,
            active_business_id: read(store.as_ref(), &id, keys::ACTIVE_BUSINESS_ID).await?,
            active_access_type: read(store.as_ref(), &id, keys::ACTIVE_ACCESS_TYPE).await?,
            active_module_code: read(store.as_ref(), &id, keys::ACTIVE_MODULE_CODE).await?,
            available_modules: read(store.as_ref(), &id, keys::AVAILABLE_MODULES)
                .await?
                .unwrap_or_default(),
        };

        Ok(Self { id, store, context })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context(&self) -> &AccessContext {
        &self.context
    }

    pub fn active_business(&self) -> Option<&ActiveBusiness> {
        self.context.active_business.as_ref()
    }

    pub fn access_type(&self) -> Option<AccessType> {
        self.context.active_access_type
    }

    pub fn module_code(&self) -> Option<&str> {
        self.context.active_module_code.as_deref()
    }

    /// Stores the business and its entitlement list.
    pub async fn set_active_business(&mut self, business: ActiveBusiness) -> Result<(), SessionError> {
        self.write(keys::ACTIVE_BUSINESS, &business).await?;
        self.write(keys::ACTIVE_BUSINESS_ID, &business.id).await?;
        self.write(keys::AVAILABLE_MODULES, &business.modules).await?;

        self.context.active_business_id = Some(business.id);
        self.context.available_modules = business.modules.clone();
        self.context.active_business = Some(business);
        Ok(())
    }

    pub async fn set_access_type(&mut self, access_type: AccessType) -> Result<(), SessionError> {
        self.write(keys::ACTIVE_ACCESS_TYPE, &access_type).await?;
        self.context.active_access_type = Some(access_type);
        Ok(())
    }

    /// Sets access type and module code together. A `None` module forgets the key.
    pub async fn set_access(&mut self, access_type: AccessType, module_code: Option<String>) -> Result<(), SessionError> {
        self.set_access_type(access_type).await?;
        match &module_code {
            Some(code) => self.write(keys::ACTIVE_MODULE_CODE, code).await?,
            None => self.store.forget(&self.id, keys::ACTIVE_MODULE_CODE).await?,
        }
        self.context.active_module_code = module_code;
        Ok(())
    }

    /// Forgets access type and module code, keeping the business.
    pub async fn clear_access(&mut self) -> Result<(), SessionError> {
        self.store.forget(&self.id, keys::ACTIVE_ACCESS_TYPE).await?;
        self.store.forget(&self.id, keys::ACTIVE_MODULE_CODE).await?;
        self.context.active_access_type = None;
        self.context.active_module_code = None;
        Ok(())
    }

    /// Forgets every access-context key and any pending flash error.
    pub async fn clear(&mut self) -> Result<(), SessionError> {
        for key in keys::ACCESS_CONTEXT {
            self.store.forget(&self.id, key).await?;
        }
        self.store.forget(&self.id, keys::FLASH_ERROR).await?;
        self.context = AccessContext::default();
        Ok(())
    }

    /// Ends the session. Its token no longer resumes it.
    pub async fn end(&mut self) -> Result<(), SessionError> {
        self.store.destroy(&self.id).await?;
        self.context = AccessContext::default();
        Ok(())
    }

    pub async fn flash_error(&self, message: &str) -> Result<(), SessionError> {
        self.write(keys::FLASH_ERROR, &message).await
    }

    /// Reads and forgets the pending flash error.
    pub async fn take_flash_error(&self) -> Result<Option<String>, SessionError> {
        let message = read(self.store.as_ref(), &self.id, keys::FLASH_ERROR).await?;
        if message.is_some() {
            self.store.forget(&self.id, keys::FLASH_ERROR).await?;
        }
        Ok(message)
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value).map_err(|e| SessionError::Encode {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.store.put(&self.id, key, value).await
    }
}

/// Undecodable values read as absent.
async fn read<T: DeserializeOwned>(store: &dyn SessionStore, session_id: &str, key: &str) -> Result<Option<T>, SessionError> {
    let Some(value) = store.get(session_id, key).await? else {
        return Ok(None);
    };

    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            tracing::warn!("Ignoring malformed session value '{}' in session {}: {}", key, session_id, e);
            Ok(None)
        }
    }
}
