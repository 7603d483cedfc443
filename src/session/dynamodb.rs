//! DynamoDB session backend for production/Lambda deployments.
//!
//! Table schema:
//! - `session_key` (S) — partition key (`affcd_session_<id>`)
//! - `record` (S) — JSON-encoded `SessionRecord`
//! - `ttl` (N) — the record's `expires`, so DynamoDB's native TTL sweep
//!   reclaims abandoned records even when the reaper is not running

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;

use super::{SessionBackend, SessionRecord, StoreError};

const KEY_ATTR: &str = "session_key";
const RECORD_ATTR: &str = "record";
const TTL_ATTR: &str = "ttl";

/// DynamoDB session backend.
pub struct DynamoDbBackend {
    client: Client,
    table_name: String,
}

impl DynamoDbBackend {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

impl SessionBackend for DynamoDbBackend {
    async fn load(&self, key: &str) -> Result<Option<SessionRecord>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(KEY_ATTR, AttributeValue::S(key.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let Some(item) = result.item() else {
            return Ok(None);
        };
        let json = item
            .get(RECORD_ATTR)
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| StoreError::Serialization(format!("{key}: missing record attribute")))?;

        serde_json::from_str(json)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn save(&self, key: &str, record: &SessionRecord) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .item(KEY_ATTR, AttributeValue::S(key.to_string()))
            .item(RECORD_ATTR, AttributeValue::S(json))
            .item(TTL_ATTR, AttributeValue::N(record.expires.to_string()))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to save session record {}: {}", key, e);
                StoreError::Backend(e.to_string())
            })?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(KEY_ATTR, AttributeValue::S(key.to_string()))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete session record {}: {}", key, e);
                StoreError::Backend(e.to_string())
            })?;
        Ok(())
    }

    async fn delete_expired(&self, key: &str, now: i64) -> Result<bool, StoreError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(KEY_ATTR, AttributeValue::S(key.to_string()))
            .condition_expression("#ttl < :now")
            .expression_attribute_names("#ttl", TTL_ATTR)
            .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            // Refreshed or already gone.
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Ok(false)
            }
            Err(e) => {
                tracing::error!("Failed to delete expired session record {}: {}", key, e);
                Err(StoreError::Backend(e.to_string()))
            }
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut start_key = None;

        loop {
            let page = self
                .client
                .scan()
                .table_name(&self.table_name)
                .projection_expression("#k")
                .expression_attribute_names("#k", KEY_ATTR)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            keys.extend(
                page.items()
                    .iter()
                    .filter_map(|item| item.get(KEY_ATTR)?.as_s().ok())
                    .filter(|k| k.starts_with(prefix))
                    .cloned(),
            );

            match page.last_evaluated_key() {
                Some(last) if !last.is_empty() => start_key = Some(last.clone()),
                _ => break,
            }
        }

        Ok(keys)
    }
}
