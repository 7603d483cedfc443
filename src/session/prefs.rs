//! Visitor preferences (`data.user_preferences`).

use serde_json::{Map, Value};

use super::{SessionBackend, SessionStore, StoreError};

pub const PREFERENCES_KEY: &str = "user_preferences";

impl<B: SessionBackend> SessionStore<B> {
    pub async fn set_preference(&mut self, name: &str, value: Value) -> Result<(), StoreError> {
        let mut prefs: Map<String, Value> = self.namespace(PREFERENCES_KEY);
        prefs.insert(name.to_string(), value);
        self.update(|data| {
            data.insert(PREFERENCES_KEY.into(), Value::Object(prefs));
        })
        .await
    }

    pub fn get_preference(&self, name: &str) -> Option<Value> {
        self.get(PREFERENCES_KEY)?.get(name).cloned()
    }
}
