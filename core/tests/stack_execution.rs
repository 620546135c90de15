mod common;

use std::sync::Arc;
use std::time::Duration;

use agentstack_core::api::{
    CancelToken, EngineError, ExecutionStatus, ExecutorConfig, FailurePolicy, GraphError,
    MemoryManager, StackExecutor, StateEvent, StateManager,
};
use common::{agent, payload, stack, Behavior, FixedRetry, ScriptedAdapter};
use pretty_assertions::assert_eq;
use serde_json::json;

fn config() -> ExecutorConfig {
    ExecutorConfig::default()
}

#[tokio::test]
async fn linear_chain_passes_outputs_downstream() {
    let adapter = ScriptedAdapter::new()
        .with("agent1", Behavior::Output(payload(json!({"text": "hello"}))))
        .shared();
    let executor = StackExecutor::new(adapter.clone(), config());
    let spec = stack(vec![
        agent("agent1", &[]),
        agent("agent2", &["agent1"]),
        agent("agent3", &["agent2"]),
    ]);

    let summary = executor.execute(&spec, &CancelToken::new()).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(adapter.calls(), vec!["agent1", "agent2", "agent3"]);

    let inputs = adapter.inputs_of("agent2").unwrap();
    assert_eq!(inputs.get("agent1"), Some(&json!({"text": "hello"})));
    assert!(adapter.inputs_of("agent1").unwrap().is_empty());

    let a3 = &summary.agent_states["agent3"];
    assert_eq!(a3.outputs.get("agent"), Some(&json!("agent3")));
    assert_eq!(a3.inputs.get("agent2").and_then(|v| v.get("agent")), Some(&json!("agent2")));
    assert_eq!(a3.attempts, 1);
}

#[tokio::test]
async fn failure_blocks_dependents_but_not_independent_agents() {
    let adapter = ScriptedAdapter::new()
        .with("agent2", Behavior::Fail("model unavailable".into()))
        .shared();
    let executor = StackExecutor::new(adapter.clone(), config());
    let spec = stack(vec![
        agent("agent1", &[]),
        agent("agent2", &["agent1"]),
        agent("agent3", &["agent2"]),
        agent("agent4", &["agent3"]),
        agent("solo", &[]),
    ]);

    let summary = executor.execute(&spec, &CancelToken::new()).await.unwrap();

    assert_eq!(summary.status_of("agent1"), Some(ExecutionStatus::Completed));
    assert_eq!(summary.status_of("agent2"), Some(ExecutionStatus::Failed));
    assert_eq!(summary.status_of("agent3"), Some(ExecutionStatus::Blocked));
    assert_eq!(summary.status_of("agent4"), Some(ExecutionStatus::Blocked));
    assert_eq!(summary.status_of("solo"), Some(ExecutionStatus::Completed));

    let failed = &summary.agent_states["agent2"];
    assert!(failed
        .error_message
        .as_deref()
        .unwrap()
        .contains("model unavailable"));
    assert!(failed.start_time.is_some() && failed.end_time.is_some());

    let blocked = &summary.agent_states["agent3"];
    assert!(blocked.error_message.as_deref().unwrap().contains("agent2"));
    assert!(blocked.start_time.is_none());

    // Blocked agents never reach the adapter
    assert_eq!(adapter.call_count("agent3"), 0);
    assert_eq!(adapter.call_count("agent4"), 0);
    assert_eq!((summary.failed_count, summary.blocked_count), (1, 2));
}

#[tokio::test]
async fn summary_counts_add_up() {
    let adapter = ScriptedAdapter::new()
        .with("b", Behavior::Fail("boom".into()))
        .shared();
    let executor = StackExecutor::new(adapter, config());
    let spec = stack(vec![
        agent("a", &[]),
        agent("b", &[]),
        agent("c", &["a", "b"]),
        agent("d", &["a"]),
    ]);

    let s = executor.execute(&spec, &CancelToken::new()).await.unwrap();

    assert_eq!(s.total_agents, 4);
    assert_eq!(
        s.completed_count + s.failed_count + s.blocked_count + s.pending_count + s.running_count,
        s.total_agents
    );
    assert_eq!(s.agents_with(ExecutionStatus::Completed), vec!["a", "d"]);
    assert_eq!(s.agents_with(ExecutionStatus::Blocked), vec!["c"]);
    assert_eq!(s.running_count, 0);
    assert!(s.end_time.is_some());
    assert!(!s.is_success());
}

#[tokio::test]
async fn independent_agents_run_concurrently() {
    let delay = Duration::from_millis(100);
    let adapter = ScriptedAdapter::new()
        .with("a", Behavior::Sleep(delay))
        .with("b", Behavior::Sleep(delay))
        .with("c", Behavior::Sleep(delay))
        .shared();
    let executor = StackExecutor::new(adapter.clone(), config());
    let spec = stack(vec![agent("a", &[]), agent("b", &[]), agent("c", &[])]);

    let summary = executor.execute(&spec, &CancelToken::new()).await.unwrap();

    assert!(summary.is_success());
    assert_eq!(adapter.peak_concurrency(), 3);
}

#[tokio::test]
async fn max_concurrency_bounds_a_batch() {
    let delay = Duration::from_millis(30);
    let mut adapter = ScriptedAdapter::new();
    let mut agents = Vec::new();
    for i in 0..6 {
        let id = format!("w{i}");
        adapter = adapter.with(&id, Behavior::Sleep(delay));
        agents.push(agent(&id, &[]));
    }
    let adapter = adapter.shared();
    let cfg = ExecutorConfig {
        max_concurrency: 2,
        ..config()
    };

    let summary = StackExecutor::new(adapter.clone(), cfg)
        .execute(&stack(agents), &CancelToken::new())
        .await
        .unwrap();

    assert!(summary.is_success());
    assert!(adapter.peak_concurrency() <= 2);
}

#[tokio::test]
async fn zero_concurrency_still_makes_progress() {
    let adapter = ScriptedAdapter::new().shared();
    let cfg = ExecutorConfig {
        max_concurrency: 0,
        ..config()
    };
    let spec = stack(vec![agent("a", &[]), agent("b", &["a"])]);

    let summary = StackExecutor::new(adapter, cfg)
        .execute(&spec, &CancelToken::new())
        .await
        .unwrap();

    assert!(summary.is_success());
}

#[tokio::test]
async fn batches_are_a_barrier() {
    let adapter = ScriptedAdapter::new()
        .with("slow", Behavior::Sleep(Duration::from_millis(80)))
        .shared();
    let executor = StackExecutor::new(adapter.clone(), config());
    let spec = stack(vec![
        agent("slow", &[]),
        agent("fast", &[]),
        agent("after_fast", &["fast"]),
    ]);

    let summary = executor.execute(&spec, &CancelToken::new()).await.unwrap();

    // after_fast belongs to batch 1 and waits for all of batch 0, including slow
    let slow_end = summary.agent_states["slow"].end_time.unwrap();
    let next_start = summary.agent_states["after_fast"].start_time.unwrap();
    assert!(next_start >= slow_end);
    assert_eq!(adapter.calls().last().map(String::as_str), Some("after_fast"));
}

#[tokio::test]
async fn timeout_marks_agent_failed() {
    let adapter = ScriptedAdapter::new()
        .with("stuck", Behavior::Sleep(Duration::from_secs(30)))
        .shared();
    let executor = StackExecutor::new(adapter, config());
    let spec = stack(vec![
        agent("stuck", &[]).with_timeout_secs(1),
        agent("next", &["stuck"]),
    ]);

    let summary = tokio::time::timeout(
        Duration::from_secs(10),
        executor.execute(&spec, &CancelToken::new()),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(summary.status_of("stuck"), Some(ExecutionStatus::Failed));
    assert!(summary.agent_states["stuck"]
        .error_message
        .as_deref()
        .unwrap()
        .contains("timed out"));
    assert_eq!(summary.status_of("next"), Some(ExecutionStatus::Blocked));
}

#[tokio::test]
async fn retry_strategy_recovers_transient_failures() {
    let adapter = ScriptedAdapter::new()
        .with("flaky", Behavior::FailTimes(2))
        .shared();
    let executor = StackExecutor::builder(adapter.clone())
        .retry_strategy(Arc::new(FixedRetry {
            attempts: 3,
            delay: Duration::from_millis(5),
        }))
        .build();
    let spec = stack(vec![agent("flaky", &[])]);

    let summary = executor.execute(&spec, &CancelToken::new()).await.unwrap();

    assert_eq!(summary.status_of("flaky"), Some(ExecutionStatus::Completed));
    assert_eq!(summary.agent_states["flaky"].attempts, 3);
    assert_eq!(adapter.call_count("flaky"), 3);
}

#[tokio::test]
async fn per_agent_retry_caps_attempts() {
    let adapter = ScriptedAdapter::new()
        .with("flaky", Behavior::FailTimes(5))
        .shared();
    let executor = StackExecutor::builder(adapter.clone())
        .retry_strategy(Arc::new(FixedRetry {
            attempts: 10,
            delay: Duration::from_millis(1),
        }))
        .build();
    let spec = stack(vec![agent("flaky", &[]).with_retry(2)]);

    let summary = executor.execute(&spec, &CancelToken::new()).await.unwrap();

    assert_eq!(summary.status_of("flaky"), Some(ExecutionStatus::Failed));
    assert_eq!(adapter.call_count("flaky"), 2);
    assert!(summary.agent_states["flaky"]
        .error_message
        .as_deref()
        .unwrap()
        .contains("attempt 2"));
}

#[tokio::test]
async fn no_strategy_means_single_attempt() {
    let adapter = ScriptedAdapter::new()
        .with("flaky", Behavior::FailTimes(1))
        .shared();
    let spec = stack(vec![agent("flaky", &[]).with_retry(5)]);

    let summary = StackExecutor::new(adapter.clone(), config())
        .execute(&spec, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(summary.status_of("flaky"), Some(ExecutionStatus::Failed));
    assert_eq!(adapter.call_count("flaky"), 1);
}

#[tokio::test]
async fn fail_fast_leaves_later_batches_pending() {
    let adapter = ScriptedAdapter::new()
        .with("a", Behavior::Fail("boom".into()))
        .shared();
    let cfg = ExecutorConfig {
        failure_policy: FailurePolicy::FailFast,
        ..config()
    };
    let spec = stack(vec![
        agent("a", &[]),
        agent("b", &[]),
        agent("c", &["b"]),
        agent("d", &["a"]),
    ]);

    let summary = StackExecutor::new(adapter.clone(), cfg)
        .execute(&spec, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(summary.status_of("a"), Some(ExecutionStatus::Failed));
    assert_eq!(summary.status_of("b"), Some(ExecutionStatus::Completed));
    assert_eq!(summary.status_of("c"), Some(ExecutionStatus::Pending));
    assert_eq!(summary.status_of("d"), Some(ExecutionStatus::Pending));
    assert_eq!(summary.pending_count, 2);
    assert_eq!(adapter.call_count("c"), 0);
}

#[tokio::test]
async fn continue_policy_runs_unaffected_branches() {
    let adapter = ScriptedAdapter::new()
        .with("a", Behavior::Fail("boom".into()))
        .shared();
    let spec = stack(vec![
        agent("a", &[]),
        agent("b", &[]),
        agent("c", &["b"]),
        agent("d", &["a"]),
    ]);

    let summary = StackExecutor::new(adapter, config())
        .execute(&spec, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(summary.status_of("c"), Some(ExecutionStatus::Completed));
    assert_eq!(summary.status_of("d"), Some(ExecutionStatus::Blocked));
}

#[tokio::test]
async fn graph_errors_abort_before_any_agent_runs() {
    let adapter = ScriptedAdapter::new().shared();
    let executor = StackExecutor::new(adapter.clone(), config());

    let cyclic = stack(vec![
        agent("agent1", &[]),
        agent("agent2", &["agent1", "agent3"]),
        agent("agent3", &["agent2"]),
    ]);
    let err = executor
        .execute(&cyclic, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Graph(GraphError::CycleDetected { .. })
    ));

    let dangling = stack(vec![agent("a", &["ghost"])]);
    let err = executor
        .execute(&dangling, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Graph(GraphError::UnknownDependency { .. })
    ));

    assert!(adapter.calls().is_empty());
}

#[tokio::test]
async fn empty_stack_succeeds_trivially() {
    let adapter = ScriptedAdapter::new().shared();
    let summary = StackExecutor::new(adapter, config())
        .execute(&stack(Vec::new()), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(summary.total_agents, 0);
    assert!(summary.is_success());
}

#[tokio::test]
async fn context_is_cleared_after_run() {
    let adapter = ScriptedAdapter::new().shared();
    let memory = MemoryManager::default();
    let executor = StackExecutor::builder(adapter)
        .memory(memory.clone())
        .build();

    let summary = executor
        .execute(&stack(vec![agent("a", &[])]), &CancelToken::new())
        .await
        .unwrap();

    assert!(memory
        .load_output(&summary.execution_id, "a")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn context_can_be_retained() {
    let adapter = ScriptedAdapter::new()
        .with("a", Behavior::Output(payload(json!({"n": 1}))))
        .shared();
    let memory = MemoryManager::default();
    let executor = StackExecutor::builder(adapter)
        .config(ExecutorConfig {
            retain_context: true,
            ..config()
        })
        .memory(memory.clone())
        .build();

    let summary = executor
        .execute(&stack(vec![agent("a", &[])]), &CancelToken::new())
        .await
        .unwrap();

    let out = memory.load_output(&summary.execution_id, "a").await.unwrap();
    assert_eq!(out, json!({"n": 1}));
}

#[tokio::test]
async fn concurrent_executions_are_isolated() {
    let adapter = ScriptedAdapter::new()
        .with("a", Behavior::Sleep(Duration::from_millis(20)))
        .shared();
    let executor = Arc::new(StackExecutor::new(adapter, config()));
    let spec = stack(vec![agent("a", &[]), agent("b", &["a"])]);

    let runs = (0..4).map(|_| {
        let executor = executor.clone();
        let spec = spec.clone();
        tokio::spawn(async move { executor.execute(&spec, &CancelToken::new()).await })
    });
    let summaries: Vec<_> = futures::future::join_all(runs)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let mut ids: Vec<&str> = summaries.iter().map(|s| s.execution_id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert!(summaries.iter().all(|s| s.is_success()));
}

#[tokio::test]
async fn state_events_follow_the_run() {
    let adapter = ScriptedAdapter::new()
        .with("b", Behavior::Fail("boom".into()))
        .shared();
    let executor = StackExecutor::new(adapter, config());
    let state = StateManager::new("exec-events", "test-stack");
    let mut rx = state.subscribe();
    let spec = stack(vec![agent("a", &[]), agent("b", &[]), agent("c", &["b"])]);

    executor
        .execute_with_state(&spec, &CancelToken::new(), state)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }

    assert!(matches!(
        events.first(),
        Some(StateEvent::ExecutionStarted { total_agents: 3, .. })
    ));
    assert!(matches!(
        events.last(),
        Some(StateEvent::ExecutionFinished { .. })
    ));
    assert!(events.iter().all(|e| e.execution_id() == "exec-events"));

    let transitions: Vec<(String, ExecutionStatus)> = events
        .iter()
        .filter_map(|e| match e {
            StateEvent::AgentStatusChanged { agent_id, to, .. } => Some((agent_id.clone(), *to)),
            _ => None,
        })
        .collect();
    assert!(transitions.contains(&("a".into(), ExecutionStatus::Completed)));
    assert!(transitions.contains(&("b".into(), ExecutionStatus::Failed)));
    assert!(transitions.contains(&("c".into(), ExecutionStatus::Blocked)));
}

#[tokio::test]
async fn api_entry_points_compose() {
    use agentstack_core::api;

    let spec = stack(vec![
        agent("a", &[]),
        agent("b", &[]),
        agent("c", &["a", "b"]),
    ]);
    let dag = api::build(&spec).unwrap();
    let plan = api::schedule(&dag).unwrap();
    assert_eq!(plan.batches, vec![vec!["a", "b"], vec!["c"]]);

    let adapter = ScriptedAdapter::new().shared();
    let summary = api::execute(&CancelToken::new(), &spec, adapter.clone(), config())
        .await
        .unwrap();
    assert!(summary.is_success());

    let inputs = adapter.inputs_of("c").unwrap();
    let mut keys: Vec<&String> = inputs.keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["a", "b"]);
}

#[tokio::test]
async fn api_execute_makes_a_single_attempt() {
    use agentstack_core::api;

    let adapter = ScriptedAdapter::new()
        .with("flaky", Behavior::FailTimes(1))
        .shared();
    let spec = stack(vec![agent("flaky", &[]).with_retry(3)]);

    let summary = api::execute(&CancelToken::new(), &spec, adapter.clone(), config())
        .await
        .unwrap();

    assert_eq!(summary.agent_states["flaky"].status, ExecutionStatus::Failed);
    assert_eq!(adapter.call_count("flaky"), 1);
}
