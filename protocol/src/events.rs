use serde::Deserialize;
use serde::Serialize;

/// Lifecycle events emitted by an execution engine while a run is in flight.
///
/// The engine is an opaque producer; the control core relies only on the
/// ordering guarantees noted per variant. Tags are kebab-case on the wire
/// (`session-established`, `content-step`, `terminal-success`,
/// `terminal-failure`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EngineEvent {
    /// First event of a successfully started run. Carries the durable
    /// session id the engine assigned, or re-confirmed on resume.
    SessionEstablished { session_id: String },
    /// One unit of agent progress. `text` contributes to the accumulated
    /// summary; file actions contribute artifact paths.
    ContentStep {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        actions: Vec<StepAction>,
    },
    /// Final event of a successful run with the engine's closing text.
    TerminalSuccess { result: String },
    /// Final event of a failed run with the engine's error detail.
    TerminalFailure { error: String },
}

/// Side-effecting actions reported inside a content step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum StepAction {
    /// The agent created a file at `path`.
    FileWrite { path: String },
    /// The agent modified an existing file at `path`.
    FileEdit { path: String },
}

impl StepAction {
    /// Path the action touched, independent of its kind.
    pub fn path(&self) -> &str {
        match self {
            Self::FileWrite { path } | Self::FileEdit { path } => path,
        }
    }
}
