//! Delegation tracking: where each in-flight call sits in its call tree.
//!
//! Contexts are immutable per call; a nested call derives its child context
//! with [`DelegationContext::descend`], which is where the depth bound and
//! the cycle rule are enforced. The registry maps live session ids to their
//! contexts so a delegation arriving from an agent can find its parent.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use conductor_protocol::DelegationSnapshot;

use crate::error::ConductorError;

/// Position of one in-flight call in its delegation tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DelegationContext {
    /// Hops below the root call; zero for the root itself.
    pub depth: usize,
    /// Agent names from the root call down to this one.
    /// `chain.len() == depth + 1` always holds.
    pub chain: Vec<String>,
    /// Session id of the root call. Empty until backfilled when the root
    /// session had not been established at construction time.
    pub root_session_id: String,
}

impl DelegationContext {
    /// Context for a root call: depth zero, chain of just the root agent.
    pub fn root(agent_name: &str, session_id: &str) -> Self {
        Self {
            depth: 0,
            chain: vec![agent_name.to_string()],
            root_session_id: session_id.to_string(),
        }
    }

    /// Derive the child context for delegating to `child_agent`.
    ///
    /// The depth bound is checked before the cycle rule, so an over-deep
    /// chain reports the depth error even when it also revisits an agent.
    /// Error chains include the rejected child, showing the full attempted
    /// path.
    pub fn descend(&self, child_agent: &str, max_depth: usize) -> Result<Self, ConductorError> {
        let attempted = self.depth + 1;
        let mut attempted_chain = self.chain.clone();
        attempted_chain.push(child_agent.to_string());

        if attempted > max_depth {
            return Err(ConductorError::DelegationDepthExceeded {
                attempted,
                max: max_depth,
                chain: attempted_chain,
            });
        }
        if self.chain.iter().any(|name| name == child_agent) {
            return Err(ConductorError::DelegationCycleDetected {
                agent: child_agent.to_string(),
                chain: attempted_chain,
            });
        }

        Ok(Self {
            depth: attempted,
            chain: attempted_chain,
            root_session_id: self.root_session_id.clone(),
        })
    }

    /// Wire-facing `{depth, chain}` view.
    pub fn snapshot(&self) -> DelegationSnapshot {
        DelegationSnapshot {
            depth: self.depth,
            chain: self.chain.clone(),
        }
    }
}

/// Contexts of in-flight calls, keyed by session id.
///
/// Entries live exactly as long as their session: registered once the
/// session is established, released on every exit path including
/// cancellation.
#[derive(Debug, Default)]
pub struct DelegationRegistry {
    contexts: Mutex<HashMap<String, DelegationContext>>,
}

impl DelegationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session_id: &str, context: DelegationContext) {
        self.lock().insert(session_id.to_string(), context);
    }

    pub fn lookup(&self, session_id: &str) -> Option<DelegationContext> {
        self.lock().get(session_id).cloned()
    }

    /// Drop a session's context. Returns whether one was registered.
    pub fn release(&self, session_id: &str) -> bool {
        self.lock().remove(session_id).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DelegationContext>> {
        match self.contexts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn root_context_has_depth_zero_and_a_single_link_chain() {
        let context = DelegationContext::root("planner", "sess-root");
        assert_eq!(context.depth, 0);
        assert_eq!(context.chain, vec!["planner"]);
        assert_eq!(context.root_session_id, "sess-root");
    }

    #[test]
    fn descend_extends_the_chain_and_keeps_the_root() {
        let root = DelegationContext::root("planner", "sess-root");
        let child = root.descend("coder", 5).expect("descend");
        assert_eq!(child.depth, 1);
        assert_eq!(child.chain, vec!["planner", "coder"]);
        assert_eq!(child.root_session_id, "sess-root");
        // The parent context is untouched.
        assert_eq!(root.chain, vec!["planner"]);
    }

    #[test]
    fn self_delegation_is_a_cycle_at_depth_zero() {
        let root = DelegationContext::root("planner", "sess-root");
        let err = root.descend("planner", 5).expect_err("self delegation");
        assert_eq!(err.code(), "delegation-cycle-detected");
        assert_eq!(err.chain(), Some(&["planner".to_string(), "planner".to_string()][..]));
    }

    #[test]
    fn revisiting_any_ancestor_is_a_cycle() {
        let context = DelegationContext::root("planner", "sess-root")
            .descend("coder", 5)
            .and_then(|c| c.descend("reviewer", 5))
            .expect("build chain");

        let err = context.descend("planner", 5).expect_err("cycle");
        assert_eq!(err.code(), "delegation-cycle-detected");
        let chain = err.chain().expect("chain");
        assert_eq!(chain, ["planner", "coder", "reviewer", "planner"]);
    }

    #[test]
    fn depth_bound_fails_exactly_at_the_transition() {
        let max = 3;
        let mut context = DelegationContext::root("agent-0", "sess-root");
        for level in 1..=max {
            context = context
                .descend(&format!("agent-{level}"), max)
                .expect("within bound");
        }
        assert_eq!(context.depth, max);

        let err = context.descend("agent-deep", max).expect_err("over bound");
        assert_eq!(err.code(), "delegation-depth-exceeded");
        let chain = err.chain().expect("chain");
        assert_eq!(chain.len(), max + 2);
        assert_eq!(chain.last().map(String::as_str), Some("agent-deep"));
    }

    #[test]
    fn depth_is_checked_before_the_cycle_rule() {
        let context = DelegationContext::root("a", "sess-root")
            .descend("b", 2)
            .and_then(|c| c.descend("c", 2))
            .expect("build chain");

        // Descending to `a` both revisits an agent and exceeds the bound;
        // the depth error wins.
        let err = context.descend("a", 2).expect_err("over bound");
        assert_eq!(err.code(), "delegation-depth-exceeded");
    }

    #[test]
    fn registry_register_lookup_release() {
        let registry = DelegationRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.lookup("s1"), None);

        registry.register("s1", DelegationContext::root("planner", "s1"));
        assert_eq!(registry.len(), 1);
        let context = registry.lookup("s1").expect("context");
        assert_eq!(context.chain, vec!["planner"]);

        assert!(registry.release("s1"));
        assert!(!registry.release("s1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let registry = DelegationRegistry::new();
        registry.register("s1", DelegationContext::root("planner", "s1"));
        registry.register("s2", DelegationContext::root("coder", "s2"));
        registry.clear();
        assert!(registry.is_empty());
    }
}
