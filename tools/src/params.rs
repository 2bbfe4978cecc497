use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use conductor_protocol::BatchTaskSpec;

/// Arguments for `run_agent`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RunAgentParams {
    /// Catalog name of the agent to run.
    pub agent: String,
    /// Task text handed to the agent.
    pub task: String,
    /// Session id to resume instead of starting fresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
    /// With `resume`, branch into a new session seeded from the resumed
    /// one instead of continuing it.
    #[serde(default)]
    pub fork: bool,
}

/// Arguments for `run_agent_batch`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RunAgentBatchParams {
    /// Between one and the configured batch maximum (default 10).
    pub tasks: Vec<BatchTaskSpec>,
}

/// Arguments for `list_agent_sessions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListAgentSessionsParams {
    /// Keep only sessions of this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Keep only sessions that are currently running.
    #[serde(default)]
    pub active_only: bool,
}

/// Arguments for `cancel_agent_session`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CancelAgentSessionParams {
    pub session_id: String,
}

/// Caller identity attached to a `delegate_to_agent` call by the transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DelegateContextData {
    /// Session id of the in-flight agent making the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calling_session_id: Option<String>,
}

/// Arguments for `delegate_to_agent`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DelegateToAgentParams {
    /// Catalog name of the agent to delegate to.
    pub agent: String,
    /// Task text handed to the delegated agent.
    pub task: String,
    /// Filled in by the transport, not by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_data: Option<DelegateContextData>,
}
