use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde_json::Map;
use serde_json::Value;

use crate::params::CancelAgentSessionParams;
use crate::params::DelegateToAgentParams;
use crate::params::ListAgentSessionsParams;
use crate::params::RunAgentBatchParams;
use crate::params::RunAgentParams;

/// One callable tool: its name, a caller-facing description, and the JSON
/// schema of its parameter object.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// The session tools exposed to the outer caller.
    pub fn caller_tools() -> Vec<Self> {
        vec![
            Self::run_agent(),
            Self::run_agent_batch(),
            Self::list_agent_sessions(),
            Self::cancel_agent_session(),
        ]
    }

    /// The delegation surface exposed only to running agents.
    pub fn agent_tools() -> Vec<Self> {
        vec![Self::delegate_to_agent()]
    }

    fn run_agent() -> Self {
        Self {
            name: "run_agent".to_string(),
            description: "Run a named agent on a task. Returns the run result \
                          and a session id that can be resumed later."
                .to_string(),
            input_schema: tool_input_schema::<RunAgentParams>(),
        }
    }

    fn run_agent_batch() -> Self {
        Self {
            name: "run_agent_batch".to_string(),
            description: "Run several independent agent tasks concurrently and \
                          wait for all of them to settle."
                .to_string(),
            input_schema: tool_input_schema::<RunAgentBatchParams>(),
        }
    }

    fn list_agent_sessions() -> Self {
        Self {
            name: "list_agent_sessions".to_string(),
            description: "List known agent sessions, most recently active \
                          first, optionally filtered by agent or activity."
                .to_string(),
            input_schema: tool_input_schema::<ListAgentSessionsParams>(),
        }
    }

    fn cancel_agent_session() -> Self {
        Self {
            name: "cancel_agent_session".to_string(),
            description: "Interrupt a running agent session and mark it \
                          complete."
                .to_string(),
            input_schema: tool_input_schema::<CancelAgentSessionParams>(),
        }
    }

    fn delegate_to_agent() -> Self {
        Self {
            name: "delegate_to_agent".to_string(),
            description: "Delegate a sub-task to another named agent and wait \
                          for its result. Depth and cycle limits apply."
                .to_string(),
            input_schema: tool_input_schema::<DelegateToAgentParams>(),
        }
    }
}

/// Generate the input schema for a parameter type, keeping only the
/// object-level keys tool clients expect.
fn tool_input_schema<T: JsonSchema>() -> Value {
    let schema = SchemaSettings::draft2019_09()
        .with(|settings| {
            settings.inline_subschemas = true;
            settings.option_add_null_type = false;
        })
        .into_generator()
        .into_root_schema_for::<T>();
    let schema_value = match serde_json::to_value(schema) {
        Ok(value) => value,
        Err(err) => panic!("tool schema should serialize: {err}"),
    };
    let mut schema_object = match schema_value {
        Value::Object(object) => object,
        other => panic!("tool schema should be a JSON object, got {other}"),
    };

    let mut input_schema = Map::new();
    for key in ["properties", "required", "type", "$defs", "definitions"] {
        if let Some(value) = schema_object.remove(key) {
            input_schema.insert(key.to_string(), value);
        }
    }
    Value::Object(input_schema)
}
