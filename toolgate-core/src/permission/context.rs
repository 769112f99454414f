//! Per-session pre-approval state.
//!
//! A tool marked approved in a session skips the decision callback for the
//! rest of that session. Sessions never see each other's approvals, and
//! nothing expires on a timer: the owner of a run clears its context when
//! the run starts over.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Identifier of a logical run or conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh random session id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Use a caller-chosen id (e.g. a conversation id).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id used by [`crate::ApprovalGate::default_context`].
    pub(crate) fn process_default() -> Self {
        Self("default".to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared table of pre-approved tools, keyed by session.
#[derive(Debug, Default)]
pub struct PreApprovalStore {
    sessions: RwLock<HashMap<SessionId, HashSet<String>>>,
}

impl PreApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn mark(&self, session: &SessionId, tool: &str) -> bool {
        self.sessions
            .write()
            .entry(session.clone())
            .or_default()
            .insert(tool.to_string())
    }

    fn contains(&self, session: &SessionId, tool: &str) -> bool {
        self.sessions
            .read()
            .get(session)
            .is_some_and(|tools| tools.contains(tool))
    }

    fn revoke(&self, session: &SessionId, tool: &str) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(session) {
            Some(tools) => tools.remove(tool),
            None => false,
        }
    }

    fn clear_session(&self, session: &SessionId) {
        self.sessions.write().remove(session);
    }

    fn tools(&self, session: &SessionId) -> Vec<String> {
        let mut tools: Vec<_> = self
            .sessions
            .read()
            .get(session)
            .map(|tools| tools.iter().cloned().collect())
            .unwrap_or_default();
        tools.sort();
        tools
    }

    /// Drop every session's approvals.
    pub fn clear_all(&self) {
        self.sessions.write().clear();
    }

    /// Number of sessions holding at least one approval.
    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|tools| !tools.is_empty())
            .count()
    }
}

/// Handle to one session's pre-approvals.
///
/// Cheap to clone; clones share state. Obtain one from
/// [`crate::ApprovalGate::context`], [`crate::ApprovalGate::new_context`] or
/// [`crate::ApprovalGate::default_context`].
///
/// # Example
///
/// ```rust
/// use toolgate_core::ApprovalGate;
///
/// let gate = ApprovalGate::new();
/// let ctx = gate.new_context();
///
/// ctx.mark_approved("execute_command");
/// assert!(ctx.is_pre_approved("execute_command"));
///
/// ctx.clear();
/// assert!(!ctx.is_pre_approved("execute_command"));
/// ```
#[derive(Debug, Clone)]
pub struct ApprovalContext {
    session: SessionId,
    store: Arc<PreApprovalStore>,
}

impl ApprovalContext {
    pub fn new(session: SessionId, store: Arc<PreApprovalStore>) -> Self {
        Self { session, store }
    }

    /// Session this context belongs to.
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Let later calls of `tool` in this session skip the callback.
    ///
    /// Returns `false` if the tool was already pre-approved.
    pub fn mark_approved(&self, tool: &str) -> bool {
        self.store.mark(&self.session, tool)
    }

    pub fn is_pre_approved(&self, tool: &str) -> bool {
        self.store.contains(&self.session, tool)
    }

    /// Withdraw a single pre-approval.
    pub fn revoke(&self, tool: &str) -> bool {
        self.store.revoke(&self.session, tool)
    }

    /// Forget every pre-approval in this session.
    pub fn clear(&self) {
        self.store.clear_session(&self.session);
    }

    /// Pre-approved tools in this session, sorted.
    pub fn approved_tools(&self) -> Vec<String> {
        self.store.tools(&self.session)
    }
}
