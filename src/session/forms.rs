//! Per-form drafts, so a visitor bouncing between pages keeps what they typed.

use serde_json::Value;
use std::collections::HashMap;

use super::{SessionBackend, SessionStore, StoreError};
use crate::types::FormDraft;

pub const FORM_DATA_KEY: &str = "form_data";

/// Drafts older than this are dropped by `cleanup_form_data`.
pub const FORM_RETENTION_SECS: i64 = 3600;

impl<B: SessionBackend> SessionStore<B> {
    fn form_drafts(&self) -> HashMap<String, FormDraft> {
        self.namespace(FORM_DATA_KEY)
    }

    async fn store_form_drafts(
        &mut self,
        drafts: HashMap<String, FormDraft>,
    ) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(drafts).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.update(|data| {
            data.insert(FORM_DATA_KEY.into(), value);
        })
        .await
    }

    pub async fn set_form_data(&mut self, form_id: &str, draft: Value) -> Result<(), StoreError> {
        let mut drafts = self.form_drafts();
        drafts.insert(
            form_id.to_string(),
            FormDraft {
                data: draft,
                timestamp: self.now(),
            },
        );
        self.store_form_drafts(drafts).await
    }

    pub fn get_form_data(&self, form_id: &str) -> Option<Value> {
        self.form_drafts().remove(form_id).map(|d| d.data)
    }

    pub async fn clear_form_data(&mut self, form_id: &str) -> Result<bool, StoreError> {
        let mut drafts = self.form_drafts();
        if drafts.remove(form_id).is_none() {
            return Ok(false);
        }
        self.store_form_drafts(drafts).await?;
        Ok(true)
    }

    /// Purge drafts past the retention window. Returns how many were dropped.
    pub async fn cleanup_form_data(&mut self) -> Result<usize, StoreError> {
        let now = self.now();
        let mut drafts = self.form_drafts();
        let before = drafts.len();
        drafts.retain(|_, d| now - d.timestamp <= FORM_RETENTION_SECS);
        let purged = before - drafts.len();
        if purged > 0 {
            self.store_form_drafts(drafts).await?;
        }
        Ok(purged)
    }
}
