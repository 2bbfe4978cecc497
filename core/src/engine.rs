//! Boundary to the external task-execution engine.
//!
//! Implementations wrap whatever actually runs an agent to completion, such
//! as a subprocess, an SDK, or a remote service. The control core treats
//! them as opaque: `start` either fails outright or produces an
//! [`ExecutionRun`] whose event stream is consumed exactly once.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use conductor_protocol::EngineEvent;

/// Everything the engine needs to open one execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    /// Catalog name of the agent being run, for routing and labeling.
    pub agent: String,
    /// Fully rendered instruction payload: system prompt plus task framing.
    pub instructions: String,
    /// Resume this engine session instead of opening a fresh one.
    pub resume_session_id: Option<String>,
    /// With `resume_session_id`, branch into a new session seeded from the
    /// resumed one instead of continuing it in place.
    pub fork: bool,
}

/// Interrupt side of an in-flight execution.
#[async_trait]
pub trait ExecutionHandle: Send + Sync {
    /// Request the engine stop the run. Best effort: the engine may take
    /// time to honor it or report failure.
    async fn interrupt(&self) -> anyhow::Result<()>;
}

/// An opened execution: the live interrupt handle plus the event stream.
///
/// Events arrive strictly in emission order and the stream ends when the
/// engine is done with the run. An `Err` item is a failure of the stream
/// itself and terminates consumption.
pub struct ExecutionRun {
    pub handle: Arc<dyn ExecutionHandle>,
    pub events: mpsc::Receiver<anyhow::Result<EngineEvent>>,
}

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn start(&self, request: ExecutionRequest) -> anyhow::Result<ExecutionRun>;
}
