//! Agent status transition rules

use super::types::ExecutionStatus;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    #[error("invalid transition for agent '{agent}': {from} -> {to}")]
    InvalidTransition {
        agent: String,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },
}

pub struct StateTransition;

impl StateTransition {
    /// Whether `from -> to` is a forward edge of the agent state machine.
    pub fn is_valid(from: ExecutionStatus, to: ExecutionStatus) -> bool {
        use ExecutionStatus::{Blocked, Completed, Failed, Pending, Running};

        matches!(
            (from, to),
            (Pending, Running) | (Pending, Blocked) | (Running, Completed) | (Running, Failed)
        )
    }

    pub fn validate(
        agent: &str,
        from: ExecutionStatus,
        to: ExecutionStatus,
    ) -> Result<(), StateError> {
        if Self::is_valid(from, to) {
            Ok(())
        } else {
            Err(StateError::InvalidTransition {
                agent: agent.to_string(),
                from,
                to,
            })
        }
    }
}
