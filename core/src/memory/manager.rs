use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::r#trait::ContextStore;
use super::store::InMemoryContextStore;
use super::types::{shared_output_key, ContextKey, Slot, StoreError};
use crate::spec::Payload;

/// Context store front-end used by the executor.
///
/// Outputs are written twice: once into the producing agent's private
/// namespace (whatever [`ContextStore`] backs it) and once into a
/// stack-shared namespace keyed by `agent_<id>_output`. Input gathering only
/// ever reads the shared namespace.
#[derive(Clone)]
pub struct MemoryManager {
    private: Arc<dyn ContextStore>,
    /// execution_id -> shared key -> value
    shared: Arc<RwLock<HashMap<String, HashMap<String, Value>>>>,
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryContextStore::new()))
    }
}

impl MemoryManager {
    pub fn new(private: Arc<dyn ContextStore>) -> Self {
        Self {
            private,
            shared: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn save_output(
        &self,
        execution_id: &str,
        agent_id: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.private
            .save(
                ContextKey::new(execution_id, agent_id, Slot::Output),
                value.clone(),
            )
            .await?;

        let mut shared = self.shared.write().await;
        shared
            .entry(execution_id.to_string())
            .or_default()
            .insert(shared_output_key(agent_id), value);
        Ok(())
    }

    pub async fn load_output(&self, execution_id: &str, agent_id: &str) -> Result<Value, StoreError> {
        let key = shared_output_key(agent_id);
        let shared = self.shared.read().await;
        shared
            .get(execution_id)
            .and_then(|ns| ns.get(&key))
            .cloned()
            .ok_or_else(|| StoreError::not_found(execution_id, key))
    }

    pub async fn save_input(
        &self,
        execution_id: &str,
        agent_id: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.private
            .save(ContextKey::new(execution_id, agent_id, Slot::Input), value)
            .await
    }

    pub async fn load_input(&self, execution_id: &str, agent_id: &str) -> Result<Value, StoreError> {
        self.private
            .load(&ContextKey::new(execution_id, agent_id, Slot::Input))
            .await
    }

    pub async fn save_state(
        &self,
        execution_id: &str,
        agent_id: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.private
            .save(ContextKey::new(execution_id, agent_id, Slot::State), value)
            .await
    }

    pub async fn load_state(&self, execution_id: &str, agent_id: &str) -> Result<Value, StoreError> {
        self.private
            .load(&ContextKey::new(execution_id, agent_id, Slot::State))
            .await
    }

    /// Best-effort lookup of several outputs. Ids without a saved output are
    /// omitted from the result.
    pub async fn collect_outputs<S: AsRef<str>>(
        &self,
        execution_id: &str,
        ids: &[S],
    ) -> Payload {
        let shared = self.shared.read().await;
        let Some(ns) = shared.get(execution_id) else {
            return Payload::new();
        };

        ids.iter()
            .filter_map(|id| {
                let id = id.as_ref();
                ns.get(&shared_output_key(id))
                    .map(|v| (id.to_string(), v.clone()))
            })
            .collect()
    }

    /// Drop both namespaces of one execution.
    pub async fn clear(&self, execution_id: &str) -> Result<(), StoreError> {
        self.shared.write().await.remove(execution_id);
        let dropped = self.private.clear_execution(execution_id).await?;
        tracing::debug!(
            target: "agentstack.flow",
            execution_id,
            backend = self.private.name(),
            dropped,
            "context cleared"
        );
        Ok(())
    }
}
