//! Affiliate attribution on top of the session bag.
//!
//! At most one attribution is active per session; setting a new one replaces
//! the old. Whether the first or the last touch wins is the caller's call.

use serde_json::{Map, Value};

use super::{SessionBackend, SessionStore, StoreError};
use crate::events::AttributionEvent;
use crate::types::AffiliateAttribution;

pub const AFFILIATE_CODE_KEY: &str = "affiliate_code";
pub const AFFILIATE_DATA_KEY: &str = "affiliate_data";

impl<B: SessionBackend> SessionStore<B> {
    /// Record `code` as this visitor's attribution and notify observers.
    pub async fn set_affiliate(
        &mut self,
        code: &str,
        source: Map<String, Value>,
    ) -> Result<AffiliateAttribution, StoreError> {
        let ctx = self.context();
        let attribution = AffiliateAttribution {
            code: code.to_string(),
            timestamp: self.now(),
            referrer: ctx.referrer.clone(),
            landing_page: ctx.path.clone(),
            user_agent: ctx.user_agent.clone(),
            ip_address: ctx.ip_address.clone(),
            source,
        };
        let stored = serde_json::to_value(&attribution)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.update(|data| {
            data.insert(AFFILIATE_CODE_KEY.into(), Value::String(attribution.code.clone()));
            data.insert(AFFILIATE_DATA_KEY.into(), stored);
        })
        .await?;

        if let Some(session_id) = self.id() {
            self.observers().notify(&AttributionEvent::Set {
                session_id: session_id.to_string(),
                attribution: attribution.clone(),
            });
        }
        Ok(attribution)
    }

    pub fn affiliate_code(&self) -> Option<String> {
        self.get_as(AFFILIATE_CODE_KEY)
    }

    pub fn affiliate(&self) -> Option<AffiliateAttribution> {
        self.get_as(AFFILIATE_DATA_KEY)
    }

    /// Drop the attribution. Returns whether one was present.
    pub async fn clear_affiliate(&mut self) -> Result<bool, StoreError> {
        if !self.has(AFFILIATE_CODE_KEY) && !self.has(AFFILIATE_DATA_KEY) {
            return Ok(false);
        }
        let previous_code = self.affiliate_code();
        self.update(|data| {
            data.remove(AFFILIATE_CODE_KEY);
            data.remove(AFFILIATE_DATA_KEY);
        })
        .await?;

        if let Some(session_id) = self.id() {
            self.observers().notify(&AttributionEvent::Cleared {
                session_id: session_id.to_string(),
                previous_code,
            });
        }
        Ok(true)
    }
}
