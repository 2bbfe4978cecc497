//! In-memory session table.
//!
//! The ledger exclusively owns session records and the interrupt handles of
//! active runs. Lookups and mutations never suspend; the async operations
//! take handles out under the lock and await interrupts only after it is
//! released.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;

use tracing::warn;

use crate::engine::ExecutionHandle;
use crate::error::ConductorError;

/// One session's row in the ledger.
#[derive(Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub agent_name: String,
    /// Task the session was first started with; never rewritten by resumes.
    pub initial_task: String,
    pub created_at: SystemTime,
    pub last_active: SystemTime,
    pub is_active: bool,
    pub(crate) handle: Option<Arc<dyn ExecutionHandle>>,
    /// Monotonic insertion rank; tie-break for equal `last_active` stamps.
    seq: u64,
}

impl std::fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecord")
            .field("session_id", &self.session_id)
            .field("agent_name", &self.agent_name)
            .field("initial_task", &self.initial_task)
            .field("created_at", &self.created_at)
            .field("last_active", &self.last_active)
            .field("is_active", &self.is_active)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

/// Filter for [`SessionLedger::list`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFilter {
    /// Keep only sessions of this agent.
    pub agent: Option<String>,
    /// Keep only sessions that are currently running.
    pub active_only: bool,
}

#[derive(Default)]
struct LedgerState {
    records: HashMap<String, SessionRecord>,
    next_seq: u64,
}

/// The session table. A session is active exactly while the ledger holds an
/// interrupt handle for it.
#[derive(Default)]
pub struct SessionLedger {
    state: Mutex<LedgerState>,
}

impl SessionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the record if absent, refresh it if present. Activity follows
    /// the presence of `handle`; `task` only seeds brand-new records.
    pub fn upsert(
        &self,
        session_id: &str,
        agent_name: &str,
        task: &str,
        handle: Option<Arc<dyn ExecutionHandle>>,
    ) {
        let now = SystemTime::now();
        let mut state = self.lock();
        match state.records.get_mut(session_id) {
            Some(record) => {
                record.last_active = now;
                record.is_active = handle.is_some();
                record.handle = handle;
            }
            None => {
                let seq = state.next_seq;
                state.next_seq += 1;
                state.records.insert(
                    session_id.to_string(),
                    SessionRecord {
                        session_id: session_id.to_string(),
                        agent_name: agent_name.to_string(),
                        initial_task: task.to_string(),
                        created_at: now,
                        last_active: now,
                        is_active: handle.is_some(),
                        handle,
                        seq,
                    },
                );
            }
        }
    }

    /// Idempotent terminal transition; no-op for unknown sessions.
    pub fn complete(&self, session_id: &str) {
        let mut state = self.lock();
        if let Some(record) = state.records.get_mut(session_id) {
            record.is_active = false;
            record.handle = None;
            record.last_active = SystemTime::now();
        }
    }

    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.lock().records.get(session_id).cloned()
    }

    /// Like [`get`](Self::get), failing with `SessionNotFound`.
    pub fn require(&self, session_id: &str) -> Result<SessionRecord, ConductorError> {
        self.get(session_id)
            .ok_or_else(|| ConductorError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// Records matching `filter`, most recently touched first. Equal stamps
    /// fall back to insertion order so repeated listings are stable.
    pub fn list(&self, filter: &SessionFilter) -> Vec<SessionRecord> {
        let state = self.lock();
        let mut records: Vec<SessionRecord> = state
            .records
            .values()
            .filter(|record| {
                if filter.active_only && !record.is_active {
                    return false;
                }
                match &filter.agent {
                    Some(agent) => record.agent_name == *agent,
                    None => true,
                }
            })
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.last_active
                .cmp(&a.last_active)
                .then_with(|| a.seq.cmp(&b.seq))
        });
        records
    }

    /// Interrupt and complete an active session.
    ///
    /// Returns `false` when there is nothing active to cancel. Returns
    /// `true` otherwise, even if the interrupt call itself fails: the
    /// record is marked complete before the handle is awaited.
    pub async fn cancel(&self, session_id: &str) -> bool {
        let handle = {
            let mut state = self.lock();
            match state.records.get_mut(session_id) {
                Some(record) if record.is_active => {
                    record.is_active = false;
                    record.last_active = SystemTime::now();
                    record.handle.take()
                }
                _ => return false,
            }
        };
        if let Some(handle) = handle
            && let Err(err) = handle.interrupt().await
        {
            warn!(session_id, error = %err, "interrupt failed; session marked complete anyway");
        }
        true
    }

    /// Drop a session's record entirely. Returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        self.lock().records.remove(session_id).is_some()
    }

    /// Best-effort interrupt of everything still active, then drop all
    /// records.
    pub async fn clear(&self) {
        let records = {
            let mut state = self.lock();
            std::mem::take(&mut state.records)
        };
        for (session_id, record) in records {
            if record.is_active
                && let Some(handle) = record.handle
                && let Err(err) = handle.interrupt().await
            {
                warn!(session_id, error = %err, "interrupt during clear failed");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
