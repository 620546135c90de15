use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque agent input/output payload.
///
/// The engine never inspects the values; it only moves them between agents.
pub type Payload = serde_json::Map<String, Value>;

/// One agent declared in a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique within the stack
    pub id: String,

    /// Reference to the agent implementation (resolved by the runtime adapter)
    pub uses: String,

    /// Ids of agents whose outputs this agent consumes
    #[serde(default, alias = "inputFrom")]
    pub input_from: Vec<String>,

    /// Per-agent timeout override in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Per-agent cap on adapter attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,

    /// Static parameters handed to the adapter unchanged
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    pub with: Payload,
}

impl AgentSpec {
    pub fn new(id: impl Into<String>, uses: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uses: uses.into(),
            input_from: Vec::new(),
            timeout_secs: None,
            retry: None,
            with: Payload::new(),
        }
    }

    pub fn with_inputs<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_from = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_retry(mut self, attempts: u32) -> Self {
        self.retry = Some(attempts);
        self
    }
}

/// A multi-agent stack. Declaration order of `agents` is significant for
/// deterministic tie-breaking in the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub agents: Vec<AgentSpec>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl StackSpec {
    pub fn new(name: impl Into<String>, agents: Vec<AgentSpec>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: default_version(),
            agents,
        }
    }

    pub fn agent(&self, id: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.id == id)
    }
}
