//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `agentstack_core::api` instead of reaching into internal modules.

use std::sync::Arc;

pub use crate::config::{load_default, load_from, EngineConfig, LoggingConfig, RetryConfig};
pub use crate::error::{AgentError, EngineError, ErrorCode, GraphError};
pub use crate::executor::{
    AgentContext, AgentRuntimeAdapter, CancelToken, ExecutionPlan, ExecutorConfig, FailurePolicy,
    RetryStrategyPlugin, StackDag, StackExecutor, StackExecutorBuilder,
};
pub use crate::memory::{ContextStore, InMemoryContextStore, MemoryManager, StoreError};
pub use crate::spec::{load_stack_spec, parse_stack_spec, AgentSpec, Payload, SpecError, StackSpec};
pub use crate::state::{
    AgentState, ExecutionStatus, StackExecutionSummary, StateEvent, StateManager,
};

/// Validate a stack and build its dependency graph.
pub fn build(spec: &StackSpec) -> Result<StackDag, GraphError> {
    StackDag::build(spec)
}

/// Order a built graph into execution batches.
pub fn schedule(dag: &StackDag) -> Result<ExecutionPlan, GraphError> {
    crate::executor::schedule(dag)
}

/// One-shot execution with a fresh executor and an in-memory context store.
///
/// Each agent gets a single adapter attempt; attach a retry strategy through
/// [`StackExecutor::builder`] to retry.
pub async fn execute(
    cancel: &CancelToken,
    spec: &StackSpec,
    adapter: Arc<dyn AgentRuntimeAdapter>,
    config: ExecutorConfig,
) -> Result<StackExecutionSummary, EngineError> {
    StackExecutor::new(adapter, config).execute(spec, cancel).await
}
