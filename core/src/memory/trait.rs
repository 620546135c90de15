use crate::memory::types::{ContextKey, StoreError};
use async_trait::async_trait;
use serde_json::Value;

/// Backend for the per-agent private namespace.
///
/// Values are opaque; a backend must return exactly what was saved.
#[async_trait]
pub trait ContextStore: Send + Sync {
    fn name(&self) -> &str;
    async fn save(&self, key: ContextKey, value: Value) -> Result<(), StoreError>;
    async fn load(&self, key: &ContextKey) -> Result<Value, StoreError>;
    /// Remove every entry of one execution; returns how many were dropped.
    async fn clear_execution(&self, execution_id: &str) -> Result<usize, StoreError>;
}
