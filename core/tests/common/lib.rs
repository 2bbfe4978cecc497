//! Shared test doubles for the conductor crates.
//!
//! The central piece is [`MockEngine`], an in-memory [`ExecutionEngine`]
//! driven by per-agent scripts, so integration tests can choreograph
//! multi-run scenarios without a real engine.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use conductor_core::AgentCatalog;
use conductor_core::AgentDefinition;
use conductor_core::Conductor;
use conductor_core::Config;
use conductor_core::ExecutionEngine;
use conductor_core::ExecutionHandle;
use conductor_core::ExecutionRequest;
use conductor_core::ExecutionRun;
use conductor_protocol::EngineEvent;
use conductor_protocol::StepAction;

/// A fresh session id for tests that do not care about the exact value.
pub fn fresh_session_id() -> String {
    format!("sess-{}", Uuid::new_v4())
}

/// Catalog of stub agents with canned prompts.
pub fn canned_catalog(names: &[&str]) -> AgentCatalog {
    let mut catalog = AgentCatalog::new();
    for name in names {
        catalog.insert(AgentDefinition {
            name: (*name).to_string(),
            description: format!("{name} test agent"),
            system_prompt: format!("You are {name}."),
            source_path: None,
        });
    }
    catalog
}

/// A conductor with default limits, the given stub agents, and `engine`.
pub fn test_conductor(engine: &Arc<MockEngine>, agents: &[&str]) -> Arc<Conductor> {
    conductor_with_config(engine, agents, Config::default())
}

pub fn conductor_with_config(
    engine: &Arc<MockEngine>,
    agents: &[&str],
    config: Config,
) -> Arc<Conductor> {
    let engine: Arc<dyn ExecutionEngine> = engine.clone();
    Arc::new(Conductor::new(config, canned_catalog(agents), engine))
}

// Event constructors, so scripts read as a timeline.

pub fn established(session_id: &str) -> EngineEvent {
    EngineEvent::SessionEstablished {
        session_id: session_id.to_string(),
    }
}

pub fn step_text(text: &str) -> EngineEvent {
    EngineEvent::ContentStep {
        text: Some(text.to_string()),
        actions: Vec::new(),
    }
}

pub fn step_write(text: &str, path: &str) -> EngineEvent {
    EngineEvent::ContentStep {
        text: Some(text.to_string()),
        actions: vec![StepAction::FileWrite {
            path: path.to_string(),
        }],
    }
}

pub fn success(result: &str) -> EngineEvent {
    EngineEvent::TerminalSuccess {
        result: result.to_string(),
    }
}

pub fn failure(error: &str) -> EngineEvent {
    EngineEvent::TerminalFailure {
        error: error.to_string(),
    }
}

#[derive(Debug, Clone)]
enum ScriptItem {
    Event(EngineEvent),
    StreamError(String),
}

/// Scripted behavior for one `start` call against [`MockEngine`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedRun {
    items: Vec<ScriptItem>,
    start_error: Option<String>,
    hold_open: bool,
}

impl ScriptedRun {
    /// Emit `events` in order, then end the stream.
    pub fn emitting(events: Vec<EngineEvent>) -> Self {
        Self {
            items: events.into_iter().map(ScriptItem::Event).collect(),
            ..Self::default()
        }
    }

    /// Establish `session_id` and succeed with `result`.
    pub fn completing(session_id: &str, result: &str) -> Self {
        Self::emitting(vec![established(session_id), success(result)])
    }

    /// Establish `session_id` and fail with `error`.
    pub fn failing(session_id: &str, error: &str) -> Self {
        Self::emitting(vec![established(session_id), failure(error)])
    }

    /// `start` itself fails with `message`.
    pub fn refusing(message: &str) -> Self {
        Self {
            start_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Emit `events`, then raise `message` as a stream error and end.
    pub fn breaking(events: Vec<EngineEvent>, message: &str) -> Self {
        let mut items: Vec<ScriptItem> = events.into_iter().map(ScriptItem::Event).collect();
        items.push(ScriptItem::StreamError(message.to_string()));
        Self {
            items,
            ..Self::default()
        }
    }

    /// Emit `events`, then keep the stream open until the run is
    /// interrupted. The stream then closes without a terminal event.
    pub fn hanging(events: Vec<EngineEvent>) -> Self {
        Self {
            items: events.into_iter().map(ScriptItem::Event).collect(),
            hold_open: true,
            ..Self::default()
        }
    }
}

/// In-memory engine. Scripts are queued per agent name and consumed by
/// `start` in queue order; an unscripted `start` fails.
#[derive(Default)]
pub struct MockEngine {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedRun>>>,
    requests: Mutex<Vec<ExecutionRequest>>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the next scripted run for `agent`.
    pub fn script(&self, agent: &str, run: ScriptedRun) {
        self.lock_scripts()
            .entry(agent.to_string())
            .or_default()
            .push_back(run);
    }

    /// Every request `start` has seen, in call order.
    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.lock_requests().clone()
    }

    fn lock_scripts(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<ScriptedRun>>> {
        match self.scripts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<ExecutionRequest>> {
        match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ExecutionEngine for MockEngine {
    async fn start(&self, request: ExecutionRequest) -> anyhow::Result<ExecutionRun> {
        self.lock_requests().push(request.clone());
        let script = self
            .lock_scripts()
            .get_mut(&request.agent)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| anyhow::anyhow!("no scripted run for agent `{}`", request.agent))?;
        if let Some(message) = script.start_error {
            anyhow::bail!("{message}");
        }

        let (tx, rx) = mpsc::channel(32);
        let token = CancellationToken::new();
        let handle = Arc::new(MockHandle {
            token: token.clone(),
            interrupts: AtomicUsize::new(0),
        });
        tokio::spawn(async move {
            for item in script.items {
                match item {
                    ScriptItem::Event(event) => {
                        if tx.send(Ok(event)).await.is_err() {
                            return;
                        }
                    }
                    ScriptItem::StreamError(message) => {
                        let _ = tx.send(Err(anyhow::anyhow!("{message}"))).await;
                        return;
                    }
                }
            }
            if script.hold_open {
                token.cancelled().await;
                // Dropping `tx` here closes the stream without a terminal
                // event, which is how a real engine looks when interrupted.
            }
        });

        Ok(ExecutionRun { handle, events: rx })
    }
}

struct MockHandle {
    token: CancellationToken,
    interrupts: AtomicUsize,
}

#[async_trait]
impl ExecutionHandle for MockHandle {
    async fn interrupt(&self) -> anyhow::Result<()> {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        self.token.cancel();
        Ok(())
    }
}
