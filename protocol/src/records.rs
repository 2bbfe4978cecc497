use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Outcome of a single agent run, fresh or resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunResult {
    pub success: bool,
    /// Absent when the engine failed before a session was established.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Final engine text when one was produced, otherwise the accumulated
    /// step text.
    pub summary: String,
    /// Paths the run reported writing or editing, in report order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One task inside a batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BatchTaskSpec {
    /// Catalog name of the agent to run the task with.
    pub agent: String,
    /// Task text handed to the agent.
    pub task: String,
    /// Identifier echoed back in the task result. Defaults to a positional
    /// label (`task-1`, `task-2`, ...) when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Settled outcome for one batch task, including tasks whose invocation
/// itself errored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTaskResult {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Measured from this task's own start to its settlement.
    pub duration_ms: u64,
}

/// Aggregate over a settled batch. Only constructed once every task has
/// settled; task results keep the order of the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub results: Vec<BatchTaskResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub all_success: bool,
    /// Wall clock from batch start to the last settlement.
    pub duration_ms: u64,
}

/// Where a call sits in its delegation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationSnapshot {
    /// Hops below the root call; zero for the root itself.
    pub depth: usize,
    /// Agent names from the root call down to this one.
    pub chain: Vec<String>,
}

/// Outcome handed back to a delegating agent. Failures are embedded here
/// and never abort the delegating agent's own run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Position the delegated call held, or would have held when it was
    /// rejected before starting.
    pub context: DelegationSnapshot,
}

/// One ledger row rendered for callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub agent_name: String,
    /// First 120 characters of the task the session was started with.
    pub task_preview: String,
    /// RFC 3339.
    pub created_at: String,
    /// RFC 3339.
    pub last_active: String,
    pub is_active: bool,
}

/// Outcome of a cancel request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelResult {
    pub success: bool,
    pub message: String,
}
