//! The conductor: validates requests, drives engine event streams to
//! completion, and maintains the ledger and delegation registry on every
//! exit path.

use std::sync::Arc;
use std::time::SystemTime;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use tracing::info;
use tracing::warn;

use conductor_protocol::AgentRunResult;
use conductor_protocol::CancelResult;
use conductor_protocol::DelegationResult;
use conductor_protocol::DelegationSnapshot;
use conductor_protocol::EngineEvent;
use conductor_protocol::SessionSummary;

use crate::catalog::AgentCatalog;
use crate::catalog::AgentDefinition;
use crate::config::Config;
use crate::delegation::DelegationContext;
use crate::delegation::DelegationRegistry;
use crate::engine::ExecutionEngine;
use crate::engine::ExecutionRequest;
use crate::engine::ExecutionRun;
use crate::error::ConductorError;
use crate::ledger::SessionFilter;
use crate::ledger::SessionLedger;

const TASK_PREVIEW_MAX_CHARS: usize = 120;

/// Parameters for a root-level run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunRequest {
    /// Catalog name of the agent to run.
    pub agent: String,
    /// Task text handed to the agent.
    pub task: String,
    /// Resume this session instead of starting fresh.
    pub resume_session_id: Option<String>,
    /// With `resume_session_id`, branch into a new session seeded from the
    /// resumed one.
    pub fork: bool,
}

/// Parameters for a nested run requested by an in-flight agent.
#[derive(Debug, Clone, PartialEq)]
pub struct DelegateRequest {
    pub agent: String,
    pub task: String,
    /// Session id of the agent asking for the delegation. `None` when the
    /// caller could not identify itself; such calls run as fresh roots.
    pub calling_session_id: Option<String>,
}

/// The control core. One instance owns the catalog, the session ledger, the
/// delegation registry, and the engine connection.
pub struct Conductor {
    config: Config,
    catalog: AgentCatalog,
    engine: Arc<dyn ExecutionEngine>,
    ledger: SessionLedger,
    contexts: DelegationRegistry,
}

impl Conductor {
    pub fn new(config: Config, catalog: AgentCatalog, engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            config,
            catalog,
            engine,
            ledger: SessionLedger::new(),
            contexts: DelegationRegistry::new(),
        }
    }

    /// Build the catalog from `config.agents_dir`; empty when unset.
    pub fn from_config(
        config: Config,
        engine: Arc<dyn ExecutionEngine>,
    ) -> Result<Self, ConductorError> {
        let catalog = match &config.agents_dir {
            Some(dir) => AgentCatalog::load_dir(dir)?,
            None => AgentCatalog::new(),
        };
        Ok(Self::new(config, catalog, engine))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &AgentCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn contexts(&self) -> &DelegationRegistry {
        &self.contexts
    }

    /// Run an agent to completion as a root call.
    ///
    /// Validation failures (unknown agent, dangling or still-active resume
    /// target) are errors and the engine is never touched. Once execution
    /// starts, engine failures fold into the returned [`AgentRunResult`]
    /// with `success == false` instead of propagating.
    pub async fn run(&self, request: RunRequest) -> Result<AgentRunResult, ConductorError> {
        self.invoke(request, None).await
    }

    /// Run an agent on behalf of an in-flight one.
    ///
    /// Never propagates the nested failure: the delegating agent always
    /// receives a structured [`DelegationResult`] and keeps running.
    pub async fn delegate(&self, request: DelegateRequest) -> DelegationResult {
        let context = match &request.calling_session_id {
            Some(calling) => match self.contexts.lookup(calling) {
                Some(parent) => {
                    match parent.descend(&request.agent, self.config.max_delegation_depth) {
                        Ok(child) => child,
                        Err(err) => {
                            let snapshot = match err.chain() {
                                Some(chain) => DelegationSnapshot {
                                    depth: chain.len().saturating_sub(1),
                                    chain: chain.to_vec(),
                                },
                                None => parent.snapshot(),
                            };
                            warn!(
                                calling_session_id = %calling,
                                agent = %request.agent,
                                error = %err,
                                "delegation rejected"
                            );
                            return failed_delegation(err.to_string(), snapshot);
                        }
                    }
                }
                None => {
                    // Nothing registered for the caller: a completed, crashed
                    // or never-established session. Run as a fresh root
                    // rather than refusing outright.
                    warn!(
                        calling_session_id = %calling,
                        agent = %request.agent,
                        "no delegation context for calling session; running as fresh root"
                    );
                    DelegationContext::root(&request.agent, calling)
                }
            },
            None => {
                warn!(
                    agent = %request.agent,
                    "delegation arrived without a calling session id; running as fresh root"
                );
                DelegationContext::root(&request.agent, "")
            }
        };

        let snapshot = context.snapshot();
        let run = RunRequest {
            agent: request.agent.clone(),
            task: request.task,
            resume_session_id: None,
            fork: false,
        };
        match self.invoke(run, Some(context)).await {
            Ok(result) => DelegationResult {
                success: result.success,
                session_id: result.session_id,
                summary: result.summary,
                artifacts: result.artifacts,
                error: result.error,
                context: snapshot,
            },
            Err(err) => {
                let wrapped = ConductorError::DelegationFailed {
                    agent: request.agent,
                    detail: err.to_string(),
                };
                failed_delegation(wrapped.to_string(), snapshot)
            }
        }
    }

    /// Ledger rows rendered for callers, most recently touched first.
    pub fn list_sessions(&self, filter: &SessionFilter) -> Vec<SessionSummary> {
        self.ledger
            .list(filter)
            .into_iter()
            .map(|record| SessionSummary {
                session_id: record.session_id,
                agent_name: record.agent_name,
                task_preview: task_preview(&record.initial_task),
                created_at: format_system_time(record.created_at),
                last_active: format_system_time(record.last_active),
                is_active: record.is_active,
            })
            .collect()
    }

    /// Cancel a session. Also drops its delegation registration so an
    /// interrupted call tree does not leak contexts.
    pub async fn cancel_session(&self, session_id: &str) -> CancelResult {
        if self.ledger.cancel(session_id).await {
            self.contexts.release(session_id);
            info!(session_id, "session cancelled");
            CancelResult {
                success: true,
                message: format!("session {session_id} cancelled"),
            }
        } else {
            CancelResult {
                success: false,
                message: format!("no active session {session_id}"),
            }
        }
    }

    /// Forget a session entirely. Returns whether it existed.
    pub fn remove_session(&self, session_id: &str) -> bool {
        self.contexts.release(session_id);
        self.ledger.remove(session_id)
    }

    /// Interrupt everything still running and drop all state.
    pub async fn clear_sessions(&self) {
        self.ledger.clear().await;
        self.contexts.clear();
    }

    async fn invoke(
        &self,
        request: RunRequest,
        context: Option<DelegationContext>,
    ) -> Result<AgentRunResult, ConductorError> {
        let definition = self
            .catalog
            .get(&request.agent)
            .ok_or_else(|| ConductorError::AgentNotFound {
                name: request.agent.clone(),
            })?;

        if let Some(resume_id) = &request.resume_session_id {
            let record = self.ledger.require(resume_id)?;
            if record.is_active {
                return Err(ConductorError::SessionAlreadyActive {
                    session_id: resume_id.clone(),
                });
            }
        }

        let instructions = build_instructions(definition, &request.task, context.as_ref());
        let execution = ExecutionRequest {
            agent: request.agent.clone(),
            instructions,
            resume_session_id: request.resume_session_id.clone(),
            fork: request.fork,
        };
        debug!(
            agent = %request.agent,
            resume = request.resume_session_id.as_deref().unwrap_or(""),
            "starting execution"
        );
        let run = match self.engine.start(execution).await {
            Ok(run) => run,
            Err(err) => {
                let failure = ConductorError::ExecutionFailed {
                    agent: request.agent.clone(),
                    detail: err.to_string(),
                };
                warn!(agent = %request.agent, error = %failure, "engine refused to start");
                return Ok(AgentRunResult {
                    success: false,
                    session_id: None,
                    summary: String::new(),
                    artifacts: Vec::new(),
                    error: Some(failure.to_string()),
                });
            }
        };

        Ok(self.drive(run, &request, context).await)
    }

    /// Consume the event stream to its end, keeping ledger and registry in
    /// step with the run's lifecycle.
    async fn drive(
        &self,
        mut run: ExecutionRun,
        request: &RunRequest,
        mut context: Option<DelegationContext>,
    ) -> AgentRunResult {
        let mut acc = RunAccumulator::default();
        let mut guard: Option<SessionGuard<'_>> = None;

        while let Some(item) = run.events.recv().await {
            match item {
                Ok(event) => {
                    if guard.is_none()
                        && let EngineEvent::SessionEstablished { session_id } = &event
                    {
                        let session_id = session_id.clone();
                        self.ledger.upsert(
                            &session_id,
                            &request.agent,
                            &request.task,
                            Some(run.handle.clone()),
                        );
                        let ctx = match context.take() {
                            Some(mut ctx) => {
                                if ctx.root_session_id.is_empty() {
                                    ctx.root_session_id = session_id.clone();
                                }
                                ctx
                            }
                            None => DelegationContext::root(&request.agent, &session_id),
                        };
                        self.contexts.register(&session_id, ctx);
                        info!(%session_id, agent = %request.agent, "session established");
                        guard = Some(SessionGuard {
                            ledger: &self.ledger,
                            contexts: &self.contexts,
                            session_id,
                        });
                    }
                    acc = acc.apply(event);
                }
                Err(err) => {
                    acc.error = Some(err.to_string());
                    break;
                }
            }
        }

        // A stream that ended without a terminal event and whose ledger row
        // was deactivated or removed mid-run was cancelled out from under
        // us. A quiet end with the row still active is just an engine that
        // stopped emitting; treat it as success with whatever accumulated.
        if acc.error.is_none()
            && !acc.terminal_seen
            && let Some(guard) = &guard
            && self
                .ledger
                .get(&guard.session_id)
                .is_none_or(|record| !record.is_active)
        {
            let cancelled = ConductorError::Cancelled {
                session_id: guard.session_id.clone(),
            };
            acc.error = Some(cancelled.to_string());
        }

        drop(guard);
        let result = acc.into_result();
        if let Some(error) = &result.error {
            warn!(agent = %request.agent, error = %error, "run finished with error");
        } else {
            debug!(agent = %request.agent, "run finished");
        }
        result
    }
}

fn failed_delegation(error: String, context: DelegationSnapshot) -> DelegationResult {
    DelegationResult {
        success: false,
        session_id: None,
        summary: String::new(),
        artifacts: Vec::new(),
        error: Some(error),
        context,
    }
}

/// Releases the ledger active state and the delegation registration for one
/// session on every exit path of `drive`.
struct SessionGuard<'a> {
    ledger: &'a SessionLedger,
    contexts: &'a DelegationRegistry,
    session_id: String,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.ledger.complete(&self.session_id);
        self.contexts.release(&self.session_id);
    }
}

/// Pure fold over a run's event stream. Collects everything the final
/// [`AgentRunResult`] needs so stream handling stays testable without an
/// engine.
#[derive(Debug, Clone, Default, PartialEq)]
struct RunAccumulator {
    session_id: Option<String>,
    chunks: Vec<String>,
    final_text: Option<String>,
    artifacts: Vec<String>,
    error: Option<String>,
    terminal_seen: bool,
}

impl RunAccumulator {
    /// Absorb one event. Streams are not trusted to be perfectly formed:
    /// duplicate establishment keeps the first id, and anything after a
    /// terminal event is folded in rather than rejected.
    fn apply(mut self, event: EngineEvent) -> Self {
        match event {
            EngineEvent::SessionEstablished { session_id } => {
                if self.session_id.is_none() {
                    self.session_id = Some(session_id);
                }
            }
            EngineEvent::ContentStep { text, actions } => {
                if let Some(text) = text
                    && !text.is_empty()
                {
                    self.chunks.push(text);
                }
                for action in actions {
                    self.artifacts.push(action.path().to_string());
                }
            }
            EngineEvent::TerminalSuccess { result } => {
                self.terminal_seen = true;
                if !result.is_empty() {
                    self.final_text = Some(result);
                }
            }
            EngineEvent::TerminalFailure { error } => {
                self.terminal_seen = true;
                self.error = Some(error);
            }
        }
        self
    }

    /// The terminal text wins; accumulated step text is the fallback so a
    /// failed run still reports the progress it made.
    fn into_result(self) -> AgentRunResult {
        let summary = self
            .final_text
            .unwrap_or_else(|| self.chunks.join("\n"));
        AgentRunResult {
            success: self.error.is_none(),
            session_id: self.session_id,
            summary,
            artifacts: self.artifacts,
            error: self.error,
        }
    }
}

/// Render the engine instruction payload: agent system prompt, the task,
/// and for delegated calls a note about where the call sits in its tree.
fn build_instructions(
    definition: &AgentDefinition,
    task: &str,
    context: Option<&DelegationContext>,
) -> String {
    let mut instructions = String::new();
    instructions.push_str(&definition.system_prompt);
    instructions.push_str("\n\n## Task\n\n");
    instructions.push_str(task);
    if let Some(context) = context
        && context.depth > 0
    {
        let depth = context.depth;
        let chain = context.chain.join(" -> ");
        instructions.push_str(&format!(
            "\n\nYou are a delegated agent at depth {depth} (call chain: {chain}). \
             Keep your work scoped to the task above."
        ));
    }
    instructions
}

/// First characters of a task for summary rows.
fn task_preview(task: &str) -> String {
    let normalized = task.trim();
    if normalized.chars().count() <= TASK_PREVIEW_MAX_CHARS {
        normalized.to_string()
    } else {
        let truncated: String = normalized.chars().take(TASK_PREVIEW_MAX_CHARS).collect();
        format!("{truncated}...")
    }
}

/// RFC 3339 rendering with an epoch fallback when conversion fails.
fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
