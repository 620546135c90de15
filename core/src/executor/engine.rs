use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AgentError, EngineError};
use crate::memory::MemoryManager;
use crate::spec::{AgentSpec, Payload, StackSpec};
use crate::state::{ExecutionStatus, StackExecutionSummary, StateError, StateManager};

use super::adapter::{AgentContext, AgentRuntimeAdapter};
use super::cancel::CancelToken;
use super::graph::StackDag;
use super::scheduler::{execute_batch_parallel, schedule, ExecutionPlan};
use super::traits::RetryStrategyPlugin;
use super::types::{ExecutorConfig, FailurePolicy};

/// How the batch loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Finished,
    /// Fail-fast stopped the run after a failed batch
    Aborted,
    Cancelled,
}

/// Execution engine for agent stacks.
///
/// Holds no per-run state: every call to [`StackExecutor::execute`] gets its
/// own execution id and [`StateManager`], so one executor can drive several
/// stacks concurrently.
pub struct StackExecutor {
    adapter: Arc<dyn AgentRuntimeAdapter>,
    config: ExecutorConfig,
    memory: MemoryManager,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
}

pub struct StackExecutorBuilder {
    adapter: Arc<dyn AgentRuntimeAdapter>,
    config: ExecutorConfig,
    memory: Option<MemoryManager>,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
}

impl StackExecutor {
    pub fn new(adapter: Arc<dyn AgentRuntimeAdapter>, config: ExecutorConfig) -> Self {
        Self {
            adapter,
            config,
            memory: MemoryManager::default(),
            retry_strategy: None,
        }
    }

    pub fn builder(adapter: Arc<dyn AgentRuntimeAdapter>) -> StackExecutorBuilder {
        StackExecutorBuilder::new(adapter)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// Run a stack to completion with a fresh execution id.
    pub async fn execute(
        &self,
        spec: &StackSpec,
        cancel: &CancelToken,
    ) -> Result<StackExecutionSummary, EngineError> {
        let state = StateManager::new(Uuid::new_v4().to_string(), spec.name.clone());
        self.execute_with_state(spec, cancel, state).await
    }

    /// Run a stack against a caller-supplied [`StateManager`] (e.g. one the
    /// caller already subscribed to).
    ///
    /// Per-agent failures never surface as `Err`; inspect the summary's
    /// `failed_count`/`blocked_count`. Cancellation returns
    /// [`EngineError::Cancelled`] carrying the partial summary.
    #[tracing::instrument(
        name = "stack.execute",
        skip_all,
        fields(stack = %spec.name, execution_id = %state.execution_id())
    )]
    pub async fn execute_with_state(
        &self,
        spec: &StackSpec,
        cancel: &CancelToken,
        state: StateManager,
    ) -> Result<StackExecutionSummary, EngineError> {
        let dag = Arc::new(StackDag::build(spec)?);
        let plan = schedule(&dag)?;

        state.initialize_agents(dag.agent_ids()).await;
        let execution_id = state.execution_id().to_string();

        info!(
            agents = dag.len(),
            batches = plan.len(),
            max_concurrency = self.config.effective_concurrency(),
            "stack execution started"
        );

        let outcome = self.execute_batches(&plan, &dag, &state, cancel).await;
        state.finish().await;

        if !self.config.retain_context {
            if let Err(e) = self.memory.clear(&execution_id).await {
                warn!(error = %e, "failed to clear execution context");
            }
        }

        let outcome = outcome?;
        let summary = state.get_summary().await;

        info!(
            completed = summary.completed_count,
            failed = summary.failed_count,
            blocked = summary.blocked_count,
            pending = summary.pending_count,
            duration_ms = summary.duration_ms,
            outcome = ?outcome,
            "stack execution finished"
        );

        match outcome {
            RunOutcome::Cancelled => Err(EngineError::Cancelled {
                summary: Box::new(summary),
            }),
            RunOutcome::Finished | RunOutcome::Aborted => Ok(summary),
        }
    }

    /// Execute all batches sequentially (agents within a batch run in parallel)
    async fn execute_batches(
        &self,
        plan: &ExecutionPlan,
        dag: &Arc<StackDag>,
        state: &StateManager,
        cancel: &CancelToken,
    ) -> Result<RunOutcome, EngineError> {
        let run = AgentRun {
            dag: dag.clone(),
            state: state.clone(),
            memory: self.memory.clone(),
            adapter: self.adapter.clone(),
            retry_strategy: self.retry_strategy.clone(),
            cancel: cancel.clone(),
            default_timeout: self.config.agent_timeout(),
        };
        let total_batches = plan.len();

        for (batch_id, agent_ids) in plan.batches.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(batch_id, "cancelled before batch start");
                return Ok(RunOutcome::Cancelled);
            }

            debug!(
                target: "agentstack.flow",
                batch_id,
                total_batches,
                agents = ?agent_ids,
                "batch start"
            );

            let run_fn = {
                let run = run.clone();
                move |agent_id: String| {
                    let run = run.clone();
                    async move {
                        match AssertUnwindSafe(run.run_agent(agent_id.clone()))
                            .catch_unwind()
                            .await
                        {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(err)) => run.settle_failed(&agent_id, err.to_string()).await,
                            Err(panic) => {
                                let message = format!("agent run panicked: {}", panic_message(&*panic));
                                run.settle_failed(&agent_id, message).await
                            }
                        }
                    }
                }
            };
            execute_batch_parallel(agent_ids, self.config.effective_concurrency(), run_fn).await?;

            debug!(target: "agentstack.flow", batch_id, "batch end");

            if cancel.is_cancelled() {
                return Ok(RunOutcome::Cancelled);
            }

            if self.config.failure_policy == FailurePolicy::FailFast {
                let mut failed = Vec::new();
                for id in agent_ids {
                    if state.get_status(id).await? == ExecutionStatus::Failed {
                        failed.push(id.as_str());
                    }
                }
                if !failed.is_empty() && batch_id + 1 < total_batches {
                    warn!(batch_id, failed = ?failed, "fail-fast: skipping remaining batches");
                    return Ok(RunOutcome::Aborted);
                }
            }
        }

        Ok(RunOutcome::Finished)
    }
}

impl StackExecutorBuilder {
    pub fn new(adapter: Arc<dyn AgentRuntimeAdapter>) -> Self {
        Self {
            adapter,
            config: ExecutorConfig::default(),
            memory: None,
            retry_strategy: None,
        }
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn memory(mut self, memory: MemoryManager) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn retry_strategy(mut self, strategy: Arc<dyn RetryStrategyPlugin>) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    pub fn build(self) -> StackExecutor {
        StackExecutor {
            adapter: self.adapter,
            config: self.config,
            memory: self.memory.unwrap_or_default(),
            retry_strategy: self.retry_strategy,
        }
    }
}

/// Everything one agent run needs, cloned into each spawned task.
#[derive(Clone)]
struct AgentRun {
    dag: Arc<StackDag>,
    state: StateManager,
    memory: MemoryManager,
    adapter: Arc<dyn AgentRuntimeAdapter>,
    retry_strategy: Option<Arc<dyn RetryStrategyPlugin>>,
    cancel: CancelToken,
    default_timeout: Duration,
}

impl AgentRun {
    /// Drive one agent to a terminal status (or leave it `Pending` when the
    /// run was cancelled before it started).
    ///
    /// Once the agent is `Running`, every failure (adapter, context store or
    /// state bookkeeping) ends in `Failed`. `Err` is left for faults that
    /// prevent even that.
    async fn run_agent(&self, agent_id: String) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            debug!(target: "agentstack.flow", agent = %agent_id, "cancelled, left pending");
            return Ok(());
        }

        let node = self
            .dag
            .node(&agent_id)
            .ok_or_else(|| StateError::UnknownAgent(agent_id.clone()))?;

        // Gather inputs from the shared namespace
        let inputs = self
            .memory
            .collect_outputs(self.state.execution_id(), node.predecessors.as_slice())
            .await;
        let missing: Vec<String> = node
            .predecessors
            .iter()
            .filter(|p| !inputs.contains_key(p.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            let err = AgentError::MissingInput {
                agent: agent_id.clone(),
                missing,
            };
            warn!(agent = %agent_id, error = %err, "agent blocked");
            self.state.mark_blocked(&agent_id, err.to_string()).await?;
            return Ok(());
        }

        self.state
            .update_status(&agent_id, ExecutionStatus::Running)
            .await?;
        debug!(target: "agentstack.flow", agent = %agent_id, uses = %node.spec.uses, "agent running");

        match self.run_started(&node.spec, inputs).await {
            Ok(()) => {
                debug!(target: "agentstack.flow", agent = %agent_id, "agent completed");
            }
            Err(err) => {
                warn!(
                    agent = %agent_id,
                    code = err.error_code().as_u16(),
                    error = %err,
                    "agent failed"
                );
                self.state.mark_failed(&agent_id, err.to_string()).await?;
            }
        }

        Ok(())
    }

    /// Everything between `Running` and `Completed`.
    async fn run_started(&self, spec: &AgentSpec, inputs: Payload) -> Result<(), AgentError> {
        let agent = spec.id.as_str();
        let execution_id = self.state.execution_id();
        let context = |source| AgentError::Context {
            agent: agent.to_string(),
            source,
        };
        let state = |source| AgentError::State {
            agent: agent.to_string(),
            source,
        };

        self.memory
            .save_input(execution_id, agent, Value::Object(inputs.clone()))
            .await
            .map_err(context)?;
        self.state
            .set_inputs(agent, inputs.clone())
            .await
            .map_err(state)?;

        let outputs = self.invoke_with_retry(spec, inputs).await?;

        self.memory
            .save_output(execution_id, agent, Value::Object(outputs.clone()))
            .await
            .map_err(context)?;
        self.state.set_outputs(agent, outputs).await.map_err(state)?;
        self.state
            .update_status(agent, ExecutionStatus::Completed)
            .await
            .map_err(state)
    }

    /// Force an agent whose run broke off into `Failed`, from whichever
    /// non-terminal status it reached.
    async fn settle_failed(&self, agent_id: &str, error: String) -> Result<(), EngineError> {
        warn!(agent = %agent_id, error = %error, "agent run aborted");

        match self.state.get_status(agent_id).await? {
            ExecutionStatus::Pending => {
                self.state
                    .update_status(agent_id, ExecutionStatus::Running)
                    .await?;
                self.state.mark_failed(agent_id, error).await?;
            }
            ExecutionStatus::Running => self.state.mark_failed(agent_id, error).await?,
            _ => {}
        }
        Ok(())
    }

    /// Bounded retry loop around the adapter call.
    async fn invoke_with_retry(
        &self,
        spec: &AgentSpec,
        inputs: Payload,
    ) -> Result<Payload, AgentError> {
        let max_attempts = self.max_attempts(spec);
        let timeout = spec
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        loop {
            let attempt = self
                .state
                .record_attempt(&spec.id)
                .await
                .map_err(|source| AgentError::State {
                    agent: spec.id.clone(),
                    source,
                })?;
            let err = match self.invoke_once(spec, inputs.clone(), attempt, timeout).await {
                Ok(outputs) => return Ok(outputs),
                Err(err) => err,
            };

            let Some(delay) = self.retry_delay(attempt, max_attempts, &err) else {
                return Err(err);
            };

            debug!(
                target: "agentstack.flow",
                agent = %spec.id,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying agent"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => return Err(err),
            }
        }
    }

    async fn invoke_once(
        &self,
        spec: &AgentSpec,
        inputs: Payload,
        attempt: u32,
        timeout: Duration,
    ) -> Result<Payload, AgentError> {
        let ctx = AgentContext {
            execution_id: self.state.execution_id().to_string(),
            stack_name: self.state.stack_name().to_string(),
            attempt,
            cancel: self.cancel.clone(),
        };

        let call = AssertUnwindSafe(self.adapter.execute(&ctx, spec, inputs)).catch_unwind();
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(Ok(outputs))) => Ok(outputs),
            Ok(Ok(Err(source))) => Err(AgentError::Execution {
                agent: spec.id.clone(),
                source,
            }),
            Ok(Err(panic)) => Err(AgentError::Panicked {
                agent: spec.id.clone(),
                message: panic_message(&*panic),
            }),
            Err(_) => Err(AgentError::Timeout {
                agent: spec.id.clone(),
                timeout,
            }),
        }
    }

    fn max_attempts(&self, spec: &AgentSpec) -> u32 {
        let Some(strategy) = self.retry_strategy.as_ref() else {
            return 1;
        };
        let max = strategy.max_attempts().max(1);
        spec.retry.map(|r| r.clamp(1, max)).unwrap_or(max)
    }

    fn retry_delay(&self, attempt: u32, max_attempts: u32, err: &AgentError) -> Option<Duration> {
        if attempt >= max_attempts || !err.is_retryable() || self.cancel.is_cancelled() {
            return None;
        }
        let strategy = self.retry_strategy.as_ref()?;
        let msg = err.to_string();
        if !strategy.should_retry(attempt, &msg) {
            return None;
        }
        strategy.next_delay(attempt, &msg)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
