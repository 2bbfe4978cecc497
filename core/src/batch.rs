//! Concurrent fan-out of independent root runs.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::info;
use tracing::warn;

use conductor_protocol::BatchResult;
use conductor_protocol::BatchTaskResult;
use conductor_protocol::BatchTaskSpec;

use crate::error::ConductorError;
use crate::invoker::Conductor;
use crate::invoker::RunRequest;

impl Conductor {
    /// Launch every task as an independent root run and wait for all of
    /// them to settle.
    ///
    /// Tasks are isolated: one failing, erroring or panicking task never
    /// touches its siblings, and the aggregate is only built once the last
    /// task has settled. Results keep the order of the request.
    pub async fn run_batch(
        self: &Arc<Self>,
        tasks: Vec<BatchTaskSpec>,
    ) -> Result<BatchResult, ConductorError> {
        let max = self.config().max_batch_tasks;
        if tasks.is_empty() {
            return Err(ConductorError::InvalidBatch {
                reason: "batch contains no tasks".to_string(),
            });
        }
        if tasks.len() > max {
            return Err(ConductorError::InvalidBatch {
                reason: format!("batch of {} tasks exceeds the maximum of {max}", tasks.len()),
            });
        }

        let ids: Vec<String> = tasks
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                spec.id
                    .clone()
                    .unwrap_or_else(|| format!("task-{}", index + 1))
            })
            .collect();

        info!(tasks = tasks.len(), "starting batch");
        let batch_started = Instant::now();
        let mut join_set: JoinSet<(usize, BatchTaskResult)> = JoinSet::new();
        for (index, spec) in tasks.into_iter().enumerate() {
            let conductor = Arc::clone(self);
            let id = ids[index].clone();
            join_set.spawn(async move {
                let task_started = Instant::now();
                let outcome = conductor
                    .run(RunRequest {
                        agent: spec.agent,
                        task: spec.task,
                        resume_session_id: None,
                        fork: false,
                    })
                    .await;
                let duration_ms = task_started.elapsed().as_millis() as u64;
                let result = match outcome {
                    Ok(result) => BatchTaskResult {
                        id,
                        success: result.success,
                        session_id: result.session_id,
                        summary: result.summary,
                        artifacts: result.artifacts,
                        error: result.error,
                        duration_ms,
                    },
                    Err(err) => BatchTaskResult {
                        id,
                        success: false,
                        session_id: None,
                        summary: String::new(),
                        artifacts: Vec::new(),
                        error: Some(err.to_string()),
                        duration_ms,
                    },
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<BatchTaskResult>> = ids.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(err) => {
                    // The task itself panicked or was aborted; its slot is
                    // settled as a failure below.
                    warn!(error = %err, "batch task died before settling");
                }
            }
        }
        let duration_ms = batch_started.elapsed().as_millis() as u64;

        let results: Vec<BatchTaskResult> = slots
            .into_iter()
            .zip(ids)
            .map(|(slot, id)| {
                slot.unwrap_or_else(|| BatchTaskResult {
                    id,
                    success: false,
                    session_id: None,
                    summary: String::new(),
                    artifacts: Vec::new(),
                    error: Some("task died before settling".to_string()),
                    duration_ms: 0,
                })
            })
            .collect();
        let succeeded = results.iter().filter(|result| result.success).count();
        let failed = results.len() - succeeded;
        info!(succeeded, failed, duration_ms, "batch settled");

        Ok(BatchResult {
            all_success: failed == 0,
            succeeded,
            failed,
            results,
            duration_ms,
        })
    }
}
