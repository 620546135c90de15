use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::Payload;

/// Execution status of a single agent.
///
/// `Pending -> Running -> {Completed, Failed}`; `Pending -> Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// A predecessor never produced output; never executed
    Blocked,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Blocked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: String,
    pub status: ExecutionStatus,
    pub inputs: Payload,
    pub outputs: Payload,
    /// Free-form per-agent values (`get`/`set`)
    #[serde(default)]
    pub data: HashMap<String, Value>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// Adapter invocations, retries included
    #[serde(default)]
    pub attempts: u32,
}

impl AgentState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ExecutionStatus::Pending,
            inputs: Payload::new(),
            outputs: Payload::new(),
            data: HashMap::new(),
            start_time: None,
            end_time: None,
            error_message: None,
            attempts: 0,
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        let (start, end) = (self.start_time?, self.end_time?);
        Some((end - start).num_milliseconds().max(0) as u64)
    }
}

/// Aggregate view of one stack execution. Always a deep copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackExecutionSummary {
    pub execution_id: String,
    pub stack_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub total_agents: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    pub blocked_count: usize,
    pub pending_count: usize,
    pub running_count: usize,
    pub agent_states: HashMap<String, AgentState>,
}

impl StackExecutionSummary {
    pub fn is_success(&self) -> bool {
        self.completed_count == self.total_agents
    }

    pub fn status_of(&self, id: &str) -> Option<ExecutionStatus> {
        self.agent_states.get(id).map(|s| s.status)
    }

    /// Ids with the given status, sorted.
    pub fn agents_with(&self, status: ExecutionStatus) -> Vec<String> {
        let mut ids: Vec<String> = self
            .agent_states
            .values()
            .filter(|s| s.status == status)
            .map(|s| s.id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// Broadcast state events
#[derive(Debug, Clone, Serialize)]
pub enum StateEvent {
    ExecutionStarted {
        execution_id: String,
        total_agents: usize,
        timestamp: DateTime<Utc>,
    },
    AgentStatusChanged {
        execution_id: String,
        agent_id: String,
        from: ExecutionStatus,
        to: ExecutionStatus,
        timestamp: DateTime<Utc>,
    },
    ExecutionFinished {
        execution_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl StateEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ExecutionStarted { timestamp, .. }
            | Self::AgentStatusChanged { timestamp, .. }
            | Self::ExecutionFinished { timestamp, .. } => *timestamp,
        }
    }

    pub fn execution_id(&self) -> &str {
        match self {
            Self::ExecutionStarted { execution_id, .. }
            | Self::AgentStatusChanged { execution_id, .. }
            | Self::ExecutionFinished { execution_id, .. } => execution_id,
        }
    }
}
