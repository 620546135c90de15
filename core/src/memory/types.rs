use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Private per-agent slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Input,
    Output,
    /// Agent-private scratch data
    State,
}

impl Slot {
    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Input => "input",
            Slot::Output => "output",
            Slot::State => "state",
        }
    }
}

/// `(execution_id, agent_id, slot)` key of the private namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub execution_id: String,
    pub agent_id: String,
    pub slot: Slot,
}

impl ContextKey {
    pub fn new(execution_id: &str, agent_id: &str, slot: Slot) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            agent_id: agent_id.to_string(),
            slot,
        }
    }
}

impl std::fmt::Display for ContextKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.execution_id,
            self.agent_id,
            self.slot.as_str()
        )
    }
}

/// Key of an agent's output in the stack-shared namespace.
pub fn shared_output_key(agent_id: &str) -> String {
    format!("agent_{agent_id}_output")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no entry '{key}' in execution '{execution_id}'")]
    NotFound { execution_id: String, key: String },

    #[error("context store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(execution_id: &str, key: impl Into<String>) -> Self {
        Self::NotFound {
            execution_id: execution_id.to_string(),
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
