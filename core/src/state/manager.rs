//! Agent state manager

use super::transitions::{StateError, StateTransition};
use super::types::{AgentState, ExecutionStatus, StackExecutionSummary, StateEvent};
use crate::spec::Payload;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Authoritative status of every agent in one stack execution.
///
/// Cheap to clone; clones share the same record.
#[derive(Clone)]
pub struct StateManager {
    inner: Arc<StateManagerInner>,
}

struct StateManagerInner {
    execution_id: String,
    stack_name: String,
    /// Single lock over the whole record
    record: RwLock<ExecutionRecord>,
    event_tx: broadcast::Sender<StateEvent>,
}

struct ExecutionRecord {
    agents: HashMap<String, AgentState>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl StateManager {
    pub fn new(execution_id: impl Into<String>, stack_name: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(1024);

        let inner = StateManagerInner {
            execution_id: execution_id.into(),
            stack_name: stack_name.into(),
            record: RwLock::new(ExecutionRecord {
                agents: HashMap::new(),
                started_at: Utc::now(),
                ended_at: None,
            }),
            event_tx,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.inner.execution_id
    }

    pub fn stack_name(&self) -> &str {
        &self.inner.stack_name
    }

    /// Subscribe to state events
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.inner.event_tx.subscribe()
    }

    fn emit_event(&self, event: StateEvent) {
        // No subscribers is not an error
        let _ = self.inner.event_tx.send(event);
    }

    /// Register every agent in `Pending` and stamp the execution start time.
    ///
    /// Any previous record for this manager is discarded.
    pub async fn initialize_agents<S: AsRef<str>>(&self, ids: &[S]) {
        let total_agents = {
            let mut record = self.inner.record.write().await;
            record.agents = ids
                .iter()
                .map(|id| (id.as_ref().to_string(), AgentState::new(id.as_ref())))
                .collect();
            record.started_at = Utc::now();
            record.ended_at = None;
            record.agents.len()
        };

        self.emit_event(StateEvent::ExecutionStarted {
            execution_id: self.inner.execution_id.clone(),
            total_agents,
            timestamp: Utc::now(),
        });
    }

    /// Move an agent along the state machine.
    pub async fn update_status(&self, id: &str, status: ExecutionStatus) -> Result<(), StateError> {
        self.transition(id, status, None).await
    }

    /// `Running -> Failed`, recording the error message.
    pub async fn mark_failed(&self, id: &str, error: impl Into<String>) -> Result<(), StateError> {
        self.transition(id, ExecutionStatus::Failed, Some(error.into()))
            .await
    }

    /// `Pending -> Blocked`, recording why the agent was never started.
    pub async fn mark_blocked(&self, id: &str, reason: impl Into<String>) -> Result<(), StateError> {
        self.transition(id, ExecutionStatus::Blocked, Some(reason.into()))
            .await
    }

    async fn transition(
        &self,
        id: &str,
        to: ExecutionStatus,
        error: Option<String>,
    ) -> Result<(), StateError> {
        let from = {
            let mut record = self.inner.record.write().await;
            let agent = record
                .agents
                .get_mut(id)
                .ok_or_else(|| StateError::UnknownAgent(id.to_string()))?;

            let from = agent.status;
            StateTransition::validate(id, from, to)?;

            let now = Utc::now();
            match to {
                ExecutionStatus::Running => {
                    agent.start_time.get_or_insert(now);
                }
                ExecutionStatus::Completed | ExecutionStatus::Failed => {
                    agent.end_time.get_or_insert(now);
                }
                ExecutionStatus::Pending | ExecutionStatus::Blocked => {}
            }
            if error.is_some() {
                agent.error_message = error;
            }
            agent.status = to;
            from
        };

        self.emit_event(StateEvent::AgentStatusChanged {
            execution_id: self.inner.execution_id.clone(),
            agent_id: id.to_string(),
            from,
            to,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    pub async fn get_status(&self, id: &str) -> Result<ExecutionStatus, StateError> {
        let record = self.inner.record.read().await;
        record
            .agents
            .get(id)
            .map(|a| a.status)
            .ok_or_else(|| StateError::UnknownAgent(id.to_string()))
    }

    /// Deep copy of one agent's state.
    pub async fn get_agent(&self, id: &str) -> Result<AgentState, StateError> {
        let record = self.inner.record.read().await;
        record
            .agents
            .get(id)
            .cloned()
            .ok_or_else(|| StateError::UnknownAgent(id.to_string()))
    }

    pub async fn get(&self, id: &str, key: &str) -> Result<Option<Value>, StateError> {
        let record = self.inner.record.read().await;
        let agent = record
            .agents
            .get(id)
            .ok_or_else(|| StateError::UnknownAgent(id.to_string()))?;
        Ok(agent.data.get(key).cloned())
    }

    pub async fn set(&self, id: &str, key: impl Into<String>, value: Value) -> Result<(), StateError> {
        self.with_agent(id, |agent| {
            agent.data.insert(key.into(), value);
        })
        .await
    }

    pub async fn set_inputs(&self, id: &str, inputs: Payload) -> Result<(), StateError> {
        self.with_agent(id, |agent| agent.inputs = inputs).await
    }

    pub async fn set_outputs(&self, id: &str, outputs: Payload) -> Result<(), StateError> {
        self.with_agent(id, |agent| agent.outputs = outputs).await
    }

    /// Count one adapter invocation; returns the new attempt number.
    pub async fn record_attempt(&self, id: &str) -> Result<u32, StateError> {
        let mut record = self.inner.record.write().await;
        let agent = record
            .agents
            .get_mut(id)
            .ok_or_else(|| StateError::UnknownAgent(id.to_string()))?;
        agent.attempts += 1;
        Ok(agent.attempts)
    }

    /// Drop an agent's data, inputs and outputs.
    ///
    /// Status and timestamps are kept so summary counts stay consistent.
    pub async fn clear(&self, id: &str) -> Result<(), StateError> {
        self.with_agent(id, |agent| {
            agent.data.clear();
            agent.inputs.clear();
            agent.outputs.clear();
        })
        .await
    }

    async fn with_agent<F>(&self, id: &str, f: F) -> Result<(), StateError>
    where
        F: FnOnce(&mut AgentState),
    {
        let mut record = self.inner.record.write().await;
        let agent = record
            .agents
            .get_mut(id)
            .ok_or_else(|| StateError::UnknownAgent(id.to_string()))?;
        f(agent);
        Ok(())
    }

    /// Stamp the execution end time (once).
    pub async fn finish(&self) {
        {
            let mut record = self.inner.record.write().await;
            if record.ended_at.is_some() {
                return;
            }
            record.ended_at = Some(Utc::now());
        }

        self.emit_event(StateEvent::ExecutionFinished {
            execution_id: self.inner.execution_id.clone(),
            timestamp: Utc::now(),
        });
    }

    /// Aggregate counts by scanning every agent. Returns a deep copy.
    pub async fn get_summary(&self) -> StackExecutionSummary {
        let record = self.inner.record.read().await;

        let mut counts: HashMap<ExecutionStatus, usize> = HashMap::new();
        for agent in record.agents.values() {
            *counts.entry(agent.status).or_default() += 1;
        }
        let count = |s: ExecutionStatus| counts.get(&s).copied().unwrap_or(0);

        let end = record.ended_at.unwrap_or_else(Utc::now);
        let duration_ms = (end - record.started_at).num_milliseconds().max(0) as u64;

        StackExecutionSummary {
            execution_id: self.inner.execution_id.clone(),
            stack_name: self.inner.stack_name.clone(),
            start_time: record.started_at,
            end_time: record.ended_at,
            duration_ms,
            total_agents: record.agents.len(),
            completed_count: count(ExecutionStatus::Completed),
            failed_count: count(ExecutionStatus::Failed),
            blocked_count: count(ExecutionStatus::Blocked),
            pending_count: count(ExecutionStatus::Pending),
            running_count: count(ExecutionStatus::Running),
            agent_states: record.agents.clone(),
        }
    }
}
