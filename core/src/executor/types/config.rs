use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the executor does once an agent ends up `Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep going; dependents are blocked by the cascade
    #[default]
    Continue,
    /// Start no further batches after a batch with a failure
    FailFast,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "continue" => Ok(Self::Continue),
            "fail_fast" => Ok(Self::FailFast),
            other => Err(format!("unknown failure policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Upper bound on agents running at once within a batch
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Default per-agent deadline, overridable per agent
    #[serde(default = "default_agent_timeout_secs")]
    pub agent_timeout_secs: u64,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Keep context store entries after the run instead of clearing them
    #[serde(default)]
    pub retain_context: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            agent_timeout_secs: default_agent_timeout_secs(),
            failure_policy: FailurePolicy::default(),
            retain_context: false,
        }
    }
}

impl ExecutorConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }
}

fn default_max_concurrency() -> usize {
    4
}

fn default_agent_timeout_secs() -> u64 {
    300
}
