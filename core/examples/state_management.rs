//! Watching a stack execution through state events
//!
//! Runs a small stack with one failing agent and prints every status change
//! as it is broadcast.
//!
//! Run: `cargo run -p agentstack-core --example state_management`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use agentstack_core::api::{
    AgentContext, AgentRuntimeAdapter, AgentSpec, CancelToken, ExecutorConfig, Payload,
    StackExecutor, StackSpec, StateEvent, StateManager,
};

/// Sleeps briefly and fails any agent whose `uses` ends in `/broken`.
struct DemoAdapter;

#[async_trait]
impl AgentRuntimeAdapter for DemoAdapter {
    fn name(&self) -> &str {
        "demo"
    }

    async fn execute(
        &self,
        _ctx: &AgentContext,
        agent: &AgentSpec,
        inputs: Payload,
    ) -> Result<Payload> {
        tokio::time::sleep(Duration::from_millis(150)).await;
        if agent.uses.ends_with("/broken") {
            anyhow::bail!("{} is broken", agent.uses);
        }

        let mut out = Payload::new();
        out.insert("summary".into(), json!(format!("{} read {} input(s)", agent.id, inputs.len())));
        Ok(out)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let spec = StackSpec::new(
        "demo-stack",
        vec![
            AgentSpec::new("research", "agents/research"),
            AgentSpec::new("outline", "agents/outline").with_inputs(["research"]),
            AgentSpec::new("draft", "agents/broken").with_inputs(["outline"]),
            AgentSpec::new("review", "agents/review").with_inputs(["draft"]),
            AgentSpec::new("glossary", "agents/glossary").with_inputs(["research"]),
        ],
    );

    let state = StateManager::new("example-run-123", spec.name.clone());
    let mut event_rx = state.subscribe();
    let listener = tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            match event {
                StateEvent::ExecutionStarted { total_agents, .. } => {
                    println!("started: {total_agents} agents");
                }
                StateEvent::AgentStatusChanged {
                    agent_id, from, to, ..
                } => {
                    println!("  {agent_id}: {from} -> {to}");
                }
                StateEvent::ExecutionFinished { .. } => {
                    println!("finished");
                    break;
                }
            }
        }
    });

    let executor = StackExecutor::new(Arc::new(DemoAdapter), ExecutorConfig::default());
    let summary = executor
        .execute_with_state(&spec, &CancelToken::new(), state)
        .await?;
    listener.await?;

    println!("\nFinal statistics:");
    println!("   Execution ID: {}", summary.execution_id);
    println!("   Duration: {}ms", summary.duration_ms);
    println!("   Completed: {}", summary.completed_count);
    println!("   Failed: {}", summary.failed_count);
    println!("   Blocked: {}", summary.blocked_count);

    for id in summary.agents_with(agentstack_core::api::ExecutionStatus::Blocked) {
        if let Some(agent) = summary.agent_states.get(&id) {
            println!("   {id}: {}", agent.error_message.as_deref().unwrap_or("-"));
        }
    }

    Ok(())
}
