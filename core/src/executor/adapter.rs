use async_trait::async_trait;

use super::cancel::CancelToken;
use crate::spec::{AgentSpec, Payload};

/// Per-invocation context handed to the adapter.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub execution_id: String,
    pub stack_name: String,
    /// 1-based attempt number
    pub attempt: u32,
    /// Forwarded from the caller; adapters may honor it cooperatively
    pub cancel: CancelToken,
}

/// Collaborator that actually runs an agent (LLM-backed or otherwise).
///
/// `inputs` maps each `input_from` id to that agent's outputs. The engine
/// treats both inputs and outputs as opaque.
#[async_trait]
pub trait AgentRuntimeAdapter: Send + Sync {
    fn name(&self) -> &str {
        "adapter"
    }

    async fn execute(
        &self,
        ctx: &AgentContext,
        agent: &AgentSpec,
        inputs: Payload,
    ) -> anyhow::Result<Payload>;
}
