//! Tool surface over the conductor core.
//!
//! This crate owns the names, parameter schemas and JSON envelopes of the
//! tools an embedder wires into its transport. Callers get the session
//! tools (`run_agent`, `run_agent_batch`, `list_agent_sessions`,
//! `cancel_agent_session`); running agents additionally get
//! `delegate_to_agent`. Dispatch never panics and never loses an error:
//! everything comes back as a [`ToolOutcome`].

mod descriptor;
mod dispatch;
mod params;

pub use descriptor::ToolDescriptor;
pub use dispatch::ToolOutcome;
pub use dispatch::handle_tool_call;
pub use params::CancelAgentSessionParams;
pub use params::DelegateContextData;
pub use params::DelegateToAgentParams;
pub use params::ListAgentSessionsParams;
pub use params::RunAgentBatchParams;
pub use params::RunAgentParams;
