//! Per-request session state machine.
//!
//! `SessionLayer::resolve` turns a `RequestContext` into a `SessionStore`
//! bound to one identity. Reads hit the in-memory copy only; every write
//! persists the whole record with a refreshed sliding expiry.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::cookie::{generate_session_id, is_valid_session_id, make_delete_cookie, make_set_cookie};
use super::{
    Clock, RequestContext, SessionBackend, SessionConfig, SessionRecord, StoreError, SystemClock,
    record_key, short_id,
};
use crate::events::Observers;

/// Shared dependencies of every request's session: backing store, policy,
/// clock and attribution observers.
pub struct SessionLayer<B: SessionBackend> {
    pub backend: Arc<B>,
    pub config: SessionConfig,
    pub clock: Arc<dyn Clock>,
    pub observers: Observers,
}

impl<B: SessionBackend> SessionLayer<B> {
    pub fn new(backend: Arc<B>, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            clock: Arc::new(SystemClock),
            observers: Observers::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_observers(mut self, observers: Observers) -> Self {
        self.observers = observers;
        self
    }

    /// Resolve the session identity for one request.
    ///
    /// A well-formed cookie is the candidate identity: a live record resumes,
    /// a missing one starts empty under the same identifier. An expired record
    /// is purged and replaced by a fresh identifier, as is a malformed cookie.
    /// Sessions are not stored until the first write.
    pub async fn resolve(self: &Arc<Self>, ctx: RequestContext) -> Result<SessionStore<B>, StoreError> {
        let now = self.clock.now();
        let candidate = ctx
            .cookie(&self.config.cookie_name())
            .filter(|v| is_valid_session_id(v))
            .map(String::from);

        let mut store = SessionStore {
            layer: Arc::clone(self),
            ctx,
            id: None,
            data: HashMap::new(),
            recorded: None,
            pending_cookies: Vec::new(),
        };

        let Some(id) = candidate else {
            store.establish_new_id();
            return Ok(store);
        };

        let key = record_key(&id);
        match self.backend.load(&key).await? {
            Some(record) if !record.is_expired(now) => {
                store.id = Some(id);
                store.recorded = Some((record.ip_address, record.user_agent));
                store.data = record.data;
            }
            Some(_) => {
                tracing::debug!(session = short_id(&id), "session expired, purging");
                self.backend.delete_expired(&key, now).await?;
                store.establish_new_id();
            }
            None => {
                // Nothing stored yet; the record is created on the first write.
                store.id = Some(id);
            }
        }

        Ok(store)
    }

    /// Delete every stored record past its deadline.
    pub async fn reap_expired(&self) -> Result<usize, StoreError> {
        super::reaper::reap_expired(self.backend.as_ref(), self.clock.as_ref()).await
    }
}

/// One visitor's session for the duration of a request.
pub struct SessionStore<B: SessionBackend> {
    layer: Arc<SessionLayer<B>>,
    ctx: RequestContext,
    id: Option<String>,
    data: HashMap<String, Value>,
    /// (ip, user agent) captured at the last persisted write.
    recorded: Option<(String, String)>,
    pending_cookies: Vec<String>,
}

impl<B: SessionBackend> SessionStore<B> {
    /// Current identifier; `None` after `destroy` until the next write.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub(crate) fn now(&self) -> i64 {
        self.layer.clock.now()
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.layer.observers
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.data.get(key).cloned().unwrap_or(default)
    }

    /// Typed read; `None` when absent or of a different shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Read one of the store's own namespaces (cart, drafts, flash, ...).
    /// A present value of the wrong shape is reported and read as empty; the
    /// next write to the namespace replaces it.
    pub(crate) fn namespace<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let Some(value) = self.data.get(key) else {
            return T::default();
        };
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(
                    session = self.id.as_deref().map(short_id).unwrap_or_default(),
                    key,
                    error = %e,
                    "session namespace has an unexpected shape, reading it as empty"
                );
                T::default()
            }
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn all(&self) -> &HashMap<String, Value> {
        &self.data
    }

    // ── Writes ──────────────────────────────────────────────────────────────

    pub async fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.update(|data| {
            data.insert(key.to_string(), value);
        })
        .await
    }

    /// Remove a key, returning its previous value. Absent keys cause no write.
    pub async fn remove(&mut self, key: &str) -> Result<Option<Value>, StoreError> {
        if !self.data.contains_key(key) {
            return Ok(None);
        }
        self.update(|data| data.remove(key)).await
    }

    pub async fn clear(&mut self) -> Result<(), StoreError> {
        self.update(|data| data.clear()).await
    }

    /// Apply `f` to the data bag and persist the full record once.
    pub(crate) async fn update<R>(
        &mut self,
        f: impl FnOnce(&mut HashMap<String, Value>) -> R,
    ) -> Result<R, StoreError> {
        let out = f(&mut self.data);
        self.persist().await?;
        Ok(out)
    }

    async fn persist(&mut self) -> Result<(), StoreError> {
        let id = self.ensure_id();
        let record = self.snapshot();
        self.layer.backend.save(&record_key(&id), &record).await?;
        self.recorded = Some((record.ip_address, record.user_agent));
        Ok(())
    }

    fn snapshot(&self) -> SessionRecord {
        let now = self.now();
        SessionRecord {
            data: self.data.clone(),
            expires: now + self.layer.config.ttl_secs,
            user_agent: self.ctx.user_agent.clone(),
            ip_address: self.ctx.ip_address.clone(),
            last_activity: now,
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Purge the stored record, evict the client cookie and reset to empty.
    pub async fn destroy(&mut self) -> Result<(), StoreError> {
        let result = match self.id.take() {
            Some(id) => self.layer.backend.delete(&record_key(&id)).await,
            None => Ok(()),
        };
        self.data.clear();
        self.recorded = None;
        self.pending_cookies
            .push(make_delete_cookie(&self.layer.config, self.ctx.is_secure));
        result
    }

    /// Move the current data to a fresh identifier (call after login).
    ///
    /// The new record is written before the old one is deleted.
    pub async fn rotate(&mut self) -> Result<String, StoreError> {
        let new_id = generate_session_id();
        let record = self.snapshot();
        self.layer.backend.save(&record_key(&new_id), &record).await?;

        let old_id = self.id.replace(new_id.clone());
        self.recorded = Some((record.ip_address, record.user_agent));
        self.pending_cookies
            .push(make_set_cookie(&self.layer.config, &new_id, self.ctx.is_secure));

        if let Some(old_id) = old_id {
            tracing::info!(
                from = short_id(&old_id),
                to = short_id(&new_id),
                "session identifier rotated"
            );
            self.layer.backend.delete(&record_key(&old_id)).await?;
        }
        Ok(new_id)
    }

    /// Compare the pinned IP / user agent against the current request.
    ///
    /// A mismatch on an enabled check destroys the session and yields
    /// `Ok(false)`. Sessions never written have nothing pinned and pass.
    pub async fn validate_security(&mut self) -> Result<bool, StoreError> {
        let Some((ip, user_agent)) = &self.recorded else {
            return Ok(true);
        };
        let config = &self.layer.config;
        let ip_mismatch = config.check_ip && *ip != self.ctx.ip_address;
        let ua_mismatch = config.check_user_agent && *user_agent != self.ctx.user_agent;

        if ip_mismatch || ua_mismatch {
            tracing::warn!(
                session = self.id.as_deref().map(short_id).unwrap_or_default(),
                ip_mismatch,
                ua_mismatch,
                "session security validation failed, destroying session"
            );
            self.destroy().await?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Drain the `Set-Cookie` values produced so far.
    pub fn take_cookies(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_cookies)
    }

    fn establish_new_id(&mut self) -> String {
        let id = generate_session_id();
        self.pending_cookies
            .push(make_set_cookie(&self.layer.config, &id, self.ctx.is_secure));
        self.id = Some(id.clone());
        id
    }

    fn ensure_id(&mut self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => self.establish_new_id(),
        }
    }
}
