use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::r#trait::ContextStore;
use super::types::{ContextKey, StoreError};

/// Process-local [`ContextStore`] backed by a map.
#[derive(Default)]
pub struct InMemoryContextStore {
    entries: RwLock<HashMap<ContextKey, Value>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn save(&self, key: ContextKey, value: Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key, value);
        Ok(())
    }

    async fn load(&self, key: &ContextKey) -> Result<Value, StoreError> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(&key.execution_id, key.to_string()))
    }

    async fn clear_execution(&self, execution_id: &str) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| k.execution_id != execution_id);
        Ok(before - entries.len())
    }
}
