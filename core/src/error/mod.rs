pub mod agent;
pub mod codes;
pub mod executor;

pub use agent::AgentError;
pub use codes::ErrorCode;
pub use executor::{EngineError, GraphError};
