use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use agentstack_core::api::{AgentContext, AgentRuntimeAdapter, AgentSpec, Payload};

/// Dry-run adapter: echoes each agent's static parameters and inputs back as
/// its output.
///
/// Two `with` keys change its behavior:
/// - `delay_ms`: simulated work before answering
/// - `fail`: error message to fail with instead of answering
pub struct EchoAdapter;

#[async_trait]
impl AgentRuntimeAdapter for EchoAdapter {
    fn name(&self) -> &str {
        "echo"
    }

    async fn execute(&self, ctx: &AgentContext, agent: &AgentSpec, inputs: Payload) -> Result<Payload> {
        if let Some(ms) = agent.with.get("delay_ms").and_then(Value::as_u64) {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
                _ = ctx.cancel.cancelled() => anyhow::bail!("interrupted by cancellation"),
            }
        }

        if let Some(msg) = agent.with.get("fail") {
            let msg = msg.as_str().map(str::to_string).unwrap_or_else(|| msg.to_string());
            anyhow::bail!(msg);
        }

        tracing::debug!(
            target: "agentstack.flow",
            agent = %agent.id,
            attempt = ctx.attempt,
            inputs = inputs.len(),
            "echo"
        );

        let mut out = Payload::new();
        out.insert("agent".into(), json!(agent.id));
        out.insert("uses".into(), json!(agent.uses));
        out.insert("with".into(), Value::Object(agent.with.clone()));
        out.insert("inputs".into(), Value::Object(inputs));
        Ok(out)
    }
}
