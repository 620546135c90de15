#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentstack_core::api::{
    AgentContext, AgentRuntimeAdapter, AgentSpec, Payload, RetryStrategyPlugin, StackSpec,
};
use async_trait::async_trait;
use serde_json::{json, Value};

/// What the scripted adapter does for one agent id.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return `{"agent": id, "inputs": [...sorted input keys]}`
    Succeed,
    /// Return the given payload
    Output(Payload),
    Fail(String),
    /// Sleep, then succeed
    Sleep(Duration),
    /// Fail the first `n` attempts, then succeed
    FailTimes(u32),
    Panic(String),
}

/// Test adapter driven by a per-agent script. Unscripted agents succeed.
#[derive(Default)]
pub struct ScriptedAdapter {
    script: HashMap<String, Behavior>,
    calls: Mutex<Vec<String>>,
    received: Mutex<HashMap<String, Payload>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, behavior: Behavior) -> Self {
        self.script.insert(id.to_string(), behavior);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Agent ids in the order their adapter calls started (one entry per attempt).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, id: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == id).count()
    }

    /// Inputs received on the last call for `id`.
    pub fn inputs_of(&self, id: &str) -> Option<Payload> {
        self.received.lock().unwrap().get(id).cloned()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentRuntimeAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(
        &self,
        ctx: &AgentContext,
        agent: &AgentSpec,
        inputs: Payload,
    ) -> anyhow::Result<Payload> {
        self.calls.lock().unwrap().push(agent.id.clone());
        self.received
            .lock()
            .unwrap()
            .insert(agent.id.clone(), inputs.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = self.run(ctx, agent, &inputs).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl ScriptedAdapter {
    async fn run(
        &self,
        ctx: &AgentContext,
        agent: &AgentSpec,
        inputs: &Payload,
    ) -> anyhow::Result<Payload> {
        match self.script.get(&agent.id).cloned().unwrap_or(Behavior::Succeed) {
            Behavior::Succeed => Ok(default_output(&agent.id, inputs)),
            Behavior::Output(out) => Ok(out),
            Behavior::Fail(msg) => Err(anyhow::anyhow!(msg)),
            Behavior::Sleep(d) => {
                tokio::time::sleep(d).await;
                Ok(default_output(&agent.id, inputs))
            }
            Behavior::FailTimes(n) if ctx.attempt <= n => {
                Err(anyhow::anyhow!("transient failure on attempt {}", ctx.attempt))
            }
            Behavior::FailTimes(_) => Ok(default_output(&agent.id, inputs)),
            Behavior::Panic(msg) => panic!("{msg}"),
        }
    }
}

fn default_output(id: &str, inputs: &Payload) -> Payload {
    let mut keys: Vec<&String> = inputs.keys().collect();
    keys.sort();
    let mut out = Payload::new();
    out.insert("agent".into(), json!(id));
    out.insert("inputs".into(), json!(keys));
    out
}

pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub fn agent(id: &str, deps: &[&str]) -> AgentSpec {
    AgentSpec::new(id, "agents/test").with_inputs(deps.iter().copied())
}

pub fn stack(agents: Vec<AgentSpec>) -> StackSpec {
    StackSpec::new("test-stack", agents)
}

/// Fixed-delay retry used to exercise the engine's retry loop.
pub struct FixedRetry {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryStrategyPlugin for FixedRetry {
    fn name(&self) -> &str {
        "fixed"
    }

    fn next_delay(&self, _attempt: u32, _error: &str) -> Option<Duration> {
        Some(self.delay)
    }

    fn max_attempts(&self) -> u32 {
        self.attempts
    }
}
