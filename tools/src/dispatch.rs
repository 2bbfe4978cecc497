use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tracing::debug;

use conductor_core::Conductor;
use conductor_core::ConductorError;
use conductor_core::DelegateRequest;
use conductor_core::RunRequest;
use conductor_core::SessionFilter;

use crate::params::CancelAgentSessionParams;
use crate::params::DelegateToAgentParams;
use crate::params::ListAgentSessionsParams;
use crate::params::RunAgentBatchParams;
use crate::params::RunAgentParams;

/// JSON outcome of one tool call: the payload plus an error flag, which is
/// what a tool transport forwards verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub payload: Value,
    pub is_error: bool,
}

impl ToolOutcome {
    fn success(payload: Value) -> Self {
        Self {
            payload,
            is_error: false,
        }
    }

    fn error(payload: Value) -> Self {
        Self {
            payload,
            is_error: true,
        }
    }
}

/// Dispatch one tool call by name.
///
/// Unknown tools and malformed arguments come back as error outcomes, never
/// as panics. Results that are themselves failure reports (a failed run, a
/// rejected delegation) are success outcomes; `is_error` marks faults of
/// the call, not of the agent.
pub async fn handle_tool_call(
    conductor: &Arc<Conductor>,
    name: &str,
    arguments: Option<Map<String, Value>>,
) -> ToolOutcome {
    debug!(tool = name, "dispatching tool call");
    match name {
        "run_agent" => match parse_arguments::<RunAgentParams>(arguments) {
            Ok(params) => run_agent(conductor, params).await,
            Err(outcome) => outcome,
        },
        "run_agent_batch" => match parse_arguments::<RunAgentBatchParams>(arguments) {
            Ok(params) => run_agent_batch(conductor, params).await,
            Err(outcome) => outcome,
        },
        // Every field of a listing filter is optional, so missing
        // arguments mean an unfiltered listing.
        "list_agent_sessions" => {
            match parse_arguments::<ListAgentSessionsParams>(arguments.or(Some(Map::new()))) {
                Ok(params) => list_agent_sessions(conductor, params),
                Err(outcome) => outcome,
            }
        }
        "cancel_agent_session" => match parse_arguments::<CancelAgentSessionParams>(arguments) {
            Ok(params) => cancel_agent_session(conductor, params).await,
            Err(outcome) => outcome,
        },
        "delegate_to_agent" => match parse_arguments::<DelegateToAgentParams>(arguments) {
            Ok(params) => delegate_to_agent(conductor, params).await,
            Err(outcome) => outcome,
        },
        _ => ToolOutcome::error(json!({
            "code": "unknown-tool",
            "message": format!("unknown tool `{name}`"),
        })),
    }
}

async fn run_agent(conductor: &Arc<Conductor>, params: RunAgentParams) -> ToolOutcome {
    let request = RunRequest {
        agent: params.agent,
        task: params.task,
        resume_session_id: params.resume,
        fork: params.fork,
    };
    match conductor.run(request).await {
        Ok(result) => success_payload(&result),
        Err(err) => ToolOutcome::error(error_body(&err)),
    }
}

async fn run_agent_batch(conductor: &Arc<Conductor>, params: RunAgentBatchParams) -> ToolOutcome {
    match conductor.run_batch(params.tasks).await {
        Ok(result) => success_payload(&result),
        Err(err) => ToolOutcome::error(error_body(&err)),
    }
}

fn list_agent_sessions(conductor: &Arc<Conductor>, params: ListAgentSessionsParams) -> ToolOutcome {
    let filter = SessionFilter {
        agent: params.agent,
        active_only: params.active_only,
    };
    success_payload(&conductor.list_sessions(&filter))
}

async fn cancel_agent_session(
    conductor: &Arc<Conductor>,
    params: CancelAgentSessionParams,
) -> ToolOutcome {
    success_payload(&conductor.cancel_session(&params.session_id).await)
}

async fn delegate_to_agent(
    conductor: &Arc<Conductor>,
    params: DelegateToAgentParams,
) -> ToolOutcome {
    let calling_session_id = params.context_data.and_then(|data| data.calling_session_id);
    let request = DelegateRequest {
        agent: params.agent,
        task: params.task,
        calling_session_id,
    };
    // Delegation failures are embedded in the result so the delegating
    // agent keeps running; is_error stays false.
    success_payload(&conductor.delegate(request).await)
}

fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<Map<String, Value>>,
) -> Result<T, ToolOutcome> {
    let Some(arguments) = arguments else {
        return Err(ToolOutcome::error(json!({
            "code": "invalid-arguments",
            "message": "missing tool arguments",
        })));
    };
    serde_json::from_value::<T>(Value::Object(arguments)).map_err(|err| {
        ToolOutcome::error(json!({
            "code": "invalid-arguments",
            "message": format!("failed to parse tool arguments: {err}"),
        }))
    })
}

fn success_payload<T: Serialize>(value: &T) -> ToolOutcome {
    match serde_json::to_value(value) {
        Ok(payload) => ToolOutcome::success(payload),
        Err(err) => ToolOutcome::error(json!({
            "code": "serialization-failed",
            "message": err.to_string(),
        })),
    }
}

/// Tagged error body: the stable code, the display message, and the
/// structured context each variant carries.
fn error_body(err: &ConductorError) -> Value {
    let mut body = Map::new();
    body.insert("code".to_string(), json!(err.code()));
    body.insert("message".to_string(), json!(err.to_string()));
    match err {
        ConductorError::AgentNotFound { name } => {
            body.insert("agent".to_string(), json!(name));
        }
        ConductorError::SessionNotFound { session_id }
        | ConductorError::SessionAlreadyActive { session_id }
        | ConductorError::Cancelled { session_id } => {
            body.insert("session_id".to_string(), json!(session_id));
        }
        ConductorError::ExecutionFailed { agent, detail }
        | ConductorError::DelegationFailed { agent, detail } => {
            body.insert("agent".to_string(), json!(agent));
            body.insert("detail".to_string(), json!(detail));
        }
        ConductorError::DelegationDepthExceeded {
            attempted,
            max,
            chain,
        } => {
            body.insert("attempted_depth".to_string(), json!(attempted));
            body.insert("max_depth".to_string(), json!(max));
            body.insert("chain".to_string(), json!(chain));
        }
        ConductorError::DelegationCycleDetected { agent, chain } => {
            body.insert("agent".to_string(), json!(agent));
            body.insert("chain".to_string(), json!(chain));
        }
        ConductorError::InvalidConfig { reason } | ConductorError::InvalidBatch { reason } => {
            body.insert("reason".to_string(), json!(reason));
        }
    }
    Value::Object(body)
}
