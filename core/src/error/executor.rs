use thiserror::Error;

use super::codes::ErrorCode;
use crate::memory::StoreError;
use crate::spec::SpecError;
use crate::state::{StackExecutionSummary, StateError};

/// Structural errors raised while building or scheduling a stack graph.
///
/// These abort `build`/`schedule` and are surfaced to the caller unmodified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate agent ID: {0}")]
    DuplicateAgentId(String),

    #[error("Unknown dependency: agent '{agent}' takes input from '{missing}'")]
    UnknownDependency { agent: String, missing: String },

    #[error("Cycle detected: {}", .path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    #[error("Internal scheduling error: {} agent(s) could not be placed", .unplaced.len())]
    InternalScheduling { unplaced: Vec<String> },
}

impl GraphError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DuplicateAgentId(_) => ErrorCode::ValidationError,
            Self::UnknownDependency { .. } => ErrorCode::DependencyError,
            Self::CycleDetected { .. } => ErrorCode::CircularDependency,
            Self::InternalScheduling { .. } => ErrorCode::SchedulingError,
        }
    }
}

/// Errors returned by `execute`.
///
/// Per-agent failures never show up here; they are recorded in the
/// [`StackExecutionSummary`] instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Execution cancelled ({} of {} agents never started)", .summary.pending_count, .summary.total_agents)]
    Cancelled { summary: Box<StackExecutionSummary> },

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Context store error: {0}")]
    Store(#[from] StoreError),

    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Map engine error to a stable error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Graph(e) => e.error_code(),
            Self::Cancelled { .. } => ErrorCode::Cancelled,
            Self::State(_) => ErrorCode::StateError,
            Self::Store(_) => ErrorCode::StoreError,
            Self::Spec(_) => ErrorCode::ParseError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Internal(_) => ErrorCode::GeneralError,
        }
    }

    /// Partial summary carried by a cancelled run.
    pub fn summary(&self) -> Option<&StackExecutionSummary> {
        match self {
            Self::Cancelled { summary } => Some(summary),
            _ => None,
        }
    }
}
