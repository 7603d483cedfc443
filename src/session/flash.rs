//! One-shot flash messages: queued on one request, shown on the next.

use serde_json::Value;

use super::{SessionBackend, SessionStore, StoreError};
use crate::types::FlashMessage;

pub const FLASH_KEY: &str = "flash_messages";

impl<B: SessionBackend> SessionStore<B> {
    pub async fn add_flash(&mut self, kind: &str, message: &str) -> Result<(), StoreError> {
        let mut queue: Vec<FlashMessage> = self.namespace(FLASH_KEY);
        queue.push(FlashMessage {
            kind: kind.to_string(),
            message: message.to_string(),
            timestamp: self.now(),
        });
        let value =
            serde_json::to_value(queue).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.update(|data| {
            data.insert(FLASH_KEY.into(), value);
        })
        .await
    }

    pub fn has_flash(&self) -> bool {
        matches!(self.get(FLASH_KEY), Some(Value::Array(items)) if !items.is_empty())
    }

    /// Return the queued messages in order and empty the queue.
    pub async fn take_flash(&mut self) -> Result<Vec<FlashMessage>, StoreError> {
        if !self.has(FLASH_KEY) {
            return Ok(Vec::new());
        }
        let queue = self.namespace(FLASH_KEY);
        self.update(|data| data.remove(FLASH_KEY)).await?;
        Ok(queue)
    }
}
