use agentstack_core::api::{
    load_stack_spec, CancelToken, EngineConfig, EngineError, ExecutorConfig, FailurePolicy,
    StackExecutionSummary, StackExecutor, StateEvent, StateManager,
};
use agentstack_plugins::factory;

use super::cli::RunArgs;
use crate::error::CliError;

pub async fn run(args: &RunArgs, cfg: &EngineConfig) -> Result<i32, CliError> {
    let spec = load_stack_spec(&args.spec)?;
    let executor = build_executor(args, cfg)?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling after in-flight agents");
                cancel.cancel();
            }
        });
    }

    let state = StateManager::new(uuid::Uuid::new_v4().to_string(), spec.name.clone());
    let mut event_rx = state.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            match event {
                StateEvent::ExecutionStarted {
                    execution_id,
                    total_agents,
                    ..
                } => {
                    tracing::debug!("Execution {} started ({} agents)", execution_id, total_agents);
                }
                StateEvent::AgentStatusChanged {
                    agent_id, from, to, ..
                } => {
                    tracing::debug!("Agent {}: {} -> {}", agent_id, from, to);
                }
                StateEvent::ExecutionFinished { .. } => break,
            }
        }
    });

    match executor.execute_with_state(&spec, &cancel, state).await {
        Ok(summary) => {
            print_summary(&summary)?;
            Ok(if summary.is_success() { 0 } else { 1 })
        }
        Err(EngineError::Cancelled { summary }) => {
            print_summary(&summary)?;
            Err(CliError::Cancelled)
        }
        Err(e) => Err(e.into()),
    }
}

/// Adapter and retry strategy come from the plugin factory; `[retry]` only
/// takes effect through this path.
fn build_executor(args: &RunArgs, cfg: &EngineConfig) -> Result<StackExecutor, CliError> {
    let adapter = factory::build_adapter(&args.adapter)?;
    let retry = factory::build_retry_strategy(&cfg.retry)?;

    Ok(StackExecutor::builder(adapter)
        .config(executor_config(args, &cfg.executor))
        .retry_strategy(retry)
        .build())
}

/// Command-line flags win over the loaded configuration.
fn executor_config(args: &RunArgs, base: &ExecutorConfig) -> ExecutorConfig {
    let mut cfg = base.clone();
    if let Some(n) = args.max_concurrency {
        cfg.max_concurrency = n;
    }
    if let Some(secs) = args.timeout_secs {
        cfg.agent_timeout_secs = secs;
    }
    if args.fail_fast {
        cfg.failure_policy = FailurePolicy::FailFast;
    }
    if args.retain_context {
        cfg.retain_context = true;
    }
    cfg
}

fn print_summary(summary: &StackExecutionSummary) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(summary)
        .map_err(|e| CliError::Command(format!("serialize summary failed: {e}")))?;
    println!("{out}");
    Ok(())
}
