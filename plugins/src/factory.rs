use std::sync::Arc;

use anyhow::Result;

use agentstack_core::api::{AgentRuntimeAdapter, RetryConfig, RetryStrategyPlugin};

use crate::adapter::EchoAdapter;
use crate::executor::{ExponentialBackoffPlugin, LinearRetryPlugin, NoRetryPlugin};

/// Retry strategy named by `[retry] strategy`.
///
/// `max_attempts <= 1` disables retry whatever the strategy name.
pub fn build_retry_strategy(cfg: &RetryConfig) -> Result<Arc<dyn RetryStrategyPlugin>> {
    if cfg.max_attempts <= 1 {
        return Ok(Arc::new(NoRetryPlugin));
    }

    match cfg.strategy.as_str() {
        "exponential-backoff" | "exponential" => {
            Ok(Arc::new(ExponentialBackoffPlugin::new(cfg.clone())))
        }
        "linear" => Ok(Arc::new(LinearRetryPlugin::new(cfg.clone()))),
        "none" => Ok(Arc::new(NoRetryPlugin)),
        other => anyhow::bail!("unknown retry strategy '{other}'"),
    }
}

pub fn build_adapter(kind: &str) -> Result<Arc<dyn AgentRuntimeAdapter>> {
    match kind {
        "echo" => Ok(Arc::new(EchoAdapter)),
        other => anyhow::bail!("unknown agent adapter '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry(strategy: &str, max_attempts: u32) -> RetryConfig {
        RetryConfig {
            strategy: strategy.to_string(),
            max_attempts,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn picks_strategy_by_name() {
        assert_eq!(
            build_retry_strategy(&retry("linear", 3)).unwrap().name(),
            "linear"
        );
        assert_eq!(
            build_retry_strategy(&retry("exponential-backoff", 3))
                .unwrap()
                .name(),
            "exponential-backoff"
        );
    }

    #[test]
    fn single_attempt_disables_retry() {
        let s = build_retry_strategy(&retry("linear", 1)).unwrap();
        assert_eq!(s.name(), "none");
        assert_eq!(s.max_attempts(), 1);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(build_retry_strategy(&retry("jitter", 3)).is_err());
        assert!(build_adapter("openai").is_err());
        assert_eq!(build_adapter("echo").unwrap().name(), "echo");
    }
}
