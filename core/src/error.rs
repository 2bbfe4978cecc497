use thiserror::Error;

/// Error taxonomy of the control core.
///
/// Every variant has a stable machine-readable code (see
/// [`ConductorError::code`]) and carries enough structured context for a
/// caller to render a useful report without parsing the display string.
#[derive(Debug, Error)]
pub enum ConductorError {
    #[error("agent `{name}` not found in the catalog")]
    AgentNotFound { name: String },

    #[error("session `{session_id}` not found")]
    SessionNotFound { session_id: String },

    #[error("session `{session_id}` is still active; cancel it before resuming")]
    SessionAlreadyActive { session_id: String },

    #[error("execution failed for agent `{agent}`: {detail}")]
    ExecutionFailed { agent: String, detail: String },

    #[error("session `{session_id}` was cancelled")]
    Cancelled { session_id: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(
        "delegation depth {attempted} exceeds the maximum of {max} (chain: {})",
        chain.join(" -> ")
    )]
    DelegationDepthExceeded {
        attempted: usize,
        max: usize,
        chain: Vec<String>,
    },

    #[error(
        "delegation cycle: agent `{agent}` already appears in the call chain {}",
        chain.join(" -> ")
    )]
    DelegationCycleDetected { agent: String, chain: Vec<String> },

    #[error("delegation to agent `{agent}` failed: {detail}")]
    DelegationFailed { agent: String, detail: String },

    #[error("invalid batch: {reason}")]
    InvalidBatch { reason: String },
}

impl ConductorError {
    /// Stable code for the wire surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AgentNotFound { .. } => "agent-not-found",
            Self::SessionNotFound { .. } => "session-not-found",
            Self::SessionAlreadyActive { .. } => "session-already-active",
            Self::ExecutionFailed { .. } => "execution-failed",
            Self::Cancelled { .. } => "cancelled",
            Self::InvalidConfig { .. } => "invalid-config",
            Self::DelegationDepthExceeded { .. } => "delegation-depth-exceeded",
            Self::DelegationCycleDetected { .. } => "delegation-cycle-detected",
            Self::DelegationFailed { .. } => "delegation-failed",
            Self::InvalidBatch { .. } => "invalid-batch",
        }
    }

    /// The attempted call chain, for the variants that carry one.
    pub fn chain(&self) -> Option<&[String]> {
        match self {
            Self::DelegationDepthExceeded { chain, .. }
            | Self::DelegationCycleDetected { chain, .. } => Some(chain),
            _ => None,
        }
    }
}
