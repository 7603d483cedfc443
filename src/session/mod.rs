//! Server-side visitor sessions.
//!
//! Provides the `SessionBackend` trait for pluggable key/value storage, the
//! persisted `SessionRecord`, and the per-request `SessionStore` with the
//! affiliate, cart, form-draft, preference and flash layers built on top.

pub mod affiliate;
pub mod cart;
pub mod context;
pub mod cookie;
pub mod dynamodb;
pub mod flash;
pub mod forms;
pub mod memory;
pub mod middleware;
pub mod prefs;
pub mod reaper;
pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use context::RequestContext;
pub use store::SessionStore;

/// Prefix of every backing-store key holding a session record.
pub const RECORD_KEY_PREFIX: &str = "affcd_session_";

/// Backing-store key for a session identifier.
pub fn record_key(session_id: &str) -> String {
    format!("{RECORD_KEY_PREFIX}{session_id}")
}

/// Session record as persisted in the backing store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub data: HashMap<String, serde_json::Value>,
    /// Unix seconds; the record is expired once `now > expires`.
    pub expires: i64,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub last_activity: i64,
}

impl SessionRecord {
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires
    }
}

/// Session policy, configured by the site administrator.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_secs: i64,
    pub cookie_suffix: String,
    pub cookie_path: String,
    pub cookie_domain: Option<String>,
    pub check_ip: bool,
    pub check_user_agent: bool,
}

impl SessionConfig {
    pub fn cookie_name(&self) -> String {
        format!("{}{}", cookie::COOKIE_PREFIX, self.cookie_suffix)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 86_400,
            cookie_suffix: "default".into(),
            cookie_path: "/".into(),
            cookie_domain: None,
            check_ip: false,
            check_user_agent: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session backend failure: {0}")]
    Backend(String),

    #[error("session record could not be (de)serialized: {0}")]
    Serialization(String),
}

/// Pluggable session storage backend.
///
/// A plain key/value contract: expiry is decided by the caller from the
/// record's `expires` field, never by the backend. Implementations must be
/// `Send + Sync` for use in Axum's async handlers.
pub trait SessionBackend: Send + Sync {
    /// Load a record by key. `Ok(None)` when absent.
    fn load(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;

    /// Overwrite the record stored under `key`.
    fn save(
        &self,
        key: &str,
        record: &SessionRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a record. Deleting an absent key succeeds.
    fn delete(&self, key: &str)
    -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete the record only if it is still expired at `now`. Returns whether
    /// a record was removed; a record refreshed since it was read survives.
    fn delete_expired(
        &self,
        key: &str,
        now: i64,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Every stored key starting with `prefix`.
    fn keys(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StoreError>> + Send;
}

/// Type-erased session backend supporting both InMemory and DynamoDB.
///
/// Since `SessionBackend` uses RPITIT, it's not object-safe. This enum
/// dispatches manually instead.
pub enum AnyBackend {
    Memory(memory::InMemoryBackend),
    DynamoDb(dynamodb::DynamoDbBackend),
}

impl AnyBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            AnyBackend::Memory(_) => "memory",
            AnyBackend::DynamoDb(_) => "dynamodb",
        }
    }
}

impl SessionBackend for AnyBackend {
    async fn load(&self, key: &str) -> Result<Option<SessionRecord>, StoreError> {
        match self {
            AnyBackend::Memory(b) => b.load(key).await,
            AnyBackend::DynamoDb(b) => b.load(key).await,
        }
    }

    async fn save(&self, key: &str, record: &SessionRecord) -> Result<(), StoreError> {
        match self {
            AnyBackend::Memory(b) => b.save(key, record).await,
            AnyBackend::DynamoDb(b) => b.save(key, record).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            AnyBackend::Memory(b) => b.delete(key).await,
            AnyBackend::DynamoDb(b) => b.delete(key).await,
        }
    }

    async fn delete_expired(&self, key: &str, now: i64) -> Result<bool, StoreError> {
        match self {
            AnyBackend::Memory(b) => b.delete_expired(key, now).await,
            AnyBackend::DynamoDb(b) => b.delete_expired(key, now).await,
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        match self {
            AnyBackend::Memory(b) => b.keys(prefix).await,
            AnyBackend::DynamoDb(b) => b.keys(prefix).await,
        }
    }
}

/// First eight characters of an identifier, for log fields.
pub(crate) fn short_id(session_id: &str) -> &str {
    session_id.get(..8).unwrap_or(session_id)
}
