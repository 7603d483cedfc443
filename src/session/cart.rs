//! Cart snapshot kept in the session.
//!
//! Items are opaque JSON values addressed by position. Removal re-compacts
//! the list, so indices are only valid until the next mutation.

use serde_json::Value;

use super::{SessionBackend, SessionStore, StoreError};

pub const CART_DATA_KEY: &str = "cart_data";
pub const CART_UPDATED_KEY: &str = "cart_updated";

impl<B: SessionBackend> SessionStore<B> {
    pub fn cart_items(&self) -> Vec<Value> {
        self.namespace(CART_DATA_KEY)
    }

    /// Append an item, returning the new cart.
    pub async fn add_cart_item(&mut self, item: Value) -> Result<Vec<Value>, StoreError> {
        let mut items = self.cart_items();
        items.push(item);
        self.store_cart(items).await
    }

    /// Remove the item at `index`. `Ok(None)` when out of range.
    pub async fn remove_cart_item(&mut self, index: usize) -> Result<Option<Value>, StoreError> {
        let mut items = self.cart_items();
        if index >= items.len() {
            return Ok(None);
        }
        let removed = items.remove(index);
        self.store_cart(items).await?;
        Ok(Some(removed))
    }

    pub async fn clear_cart(&mut self) -> Result<(), StoreError> {
        self.update(|data| {
            data.remove(CART_DATA_KEY);
            data.remove(CART_UPDATED_KEY);
        })
        .await
    }

    async fn store_cart(&mut self, items: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let now = self.now();
        self.update(|data| {
            data.insert(CART_DATA_KEY.into(), Value::Array(items.clone()));
            data.insert(CART_UPDATED_KEY.into(), Value::from(now));
        })
        .await?;
        Ok(items)
    }
}
