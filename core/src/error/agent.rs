use std::time::Duration;

use thiserror::Error;

use super::codes::ErrorCode;
use crate::memory::StoreError;
use crate::state::StateError;

/// Per-agent runtime failures.
///
/// These are non-fatal to the run: the executor records them on the agent's
/// state and lets the `Blocked` cascade carry the consequence downstream.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("agent '{agent}' is missing input from: {}", .missing.join(", "))]
    MissingInput { agent: String, missing: Vec<String> },

    #[error("agent '{agent}' failed: {source}")]
    Execution {
        agent: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("agent '{agent}' timed out after {}s", .timeout.as_secs_f64())]
    Timeout { agent: String, timeout: Duration },

    #[error("agent '{agent}' panicked: {message}")]
    Panicked { agent: String, message: String },

    #[error("agent '{agent}' context write failed: {source}")]
    Context {
        agent: String,
        #[source]
        source: StoreError,
    },

    #[error("agent '{agent}' state update failed: {source}")]
    State {
        agent: String,
        #[source]
        source: StateError,
    },
}

impl AgentError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingInput { .. } => ErrorCode::MissingInput,
            Self::Execution { .. } => ErrorCode::AgentFailed,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Panicked { .. } => ErrorCode::AgentFailed,
            Self::Context { .. } => ErrorCode::StoreError,
            Self::State { .. } => ErrorCode::StateError,
        }
    }

    pub fn agent(&self) -> &str {
        match self {
            Self::MissingInput { agent, .. }
            | Self::Execution { agent, .. }
            | Self::Timeout { agent, .. }
            | Self::Panicked { agent, .. }
            | Self::Context { agent, .. }
            | Self::State { agent, .. } => agent,
        }
    }

    /// Whether a retry strategy may re-invoke the adapter for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution { .. } | Self::Timeout { .. })
    }
}
