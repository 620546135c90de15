use agentstack_core::api::{EngineError, GraphError, SpecError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("{0}")]
    Spec(#[from] SpecError),
    #[error("invalid stack: {0}")]
    Graph(#[from] GraphError),
    #[error("execution cancelled")]
    Cancelled,
    #[error("engine error: {0}")]
    Engine(EngineError),
    #[error("command failed: {0}")]
    Command(String),
    /// Adapter or retry strategy could not be built from its name/config
    #[error("plugin error: {0}")]
    Plugin(#[from] anyhow::Error),
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Graph(g) => Self::Graph(g),
            EngineError::Spec(s) => Self::Spec(s),
            EngineError::Config(c) => Self::Config(c),
            EngineError::Cancelled { .. } => Self::Cancelled,
            other => Self::Engine(other),
        }
    }
}

impl CliError {
    // 0: success
    // 1: run finished with failed, blocked or skipped agents (not an error)
    // 11: config or plugin selection error
    // 20: spec / IO error
    // 30: invalid stack graph
    // 50: internal/uncategorized
    // 130: cancelled
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Plugin(_) => 11,
            Self::Spec(_) | Self::Command(_) => 20,
            Self::Graph(_) => 30,
            Self::Cancelled => 130,
            Self::Engine(_) => 50,
        }
    }
}
