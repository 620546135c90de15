mod load;
mod types;

pub use load::{
    apply_env_overrides, get_agentstack_data_dir, load_default, load_from, ENV_AGENT_TIMEOUT_SECS,
    ENV_FAILURE_POLICY, ENV_LOG_LEVEL, ENV_MAX_CONCURRENCY,
};
pub use types::{EngineConfig, LoggingConfig, RetryConfig};
