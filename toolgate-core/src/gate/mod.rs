//! The approval gate: the service object agents call before running a tool.
//!
//! An [`ApprovalGate`] owns the risk registry, the active decision callback
//! and the pre-approval store. Agent runtimes hold one (usually behind an
//! `Arc`) instead of reaching for global state.
//!
//! Evaluation order for every request:
//!
//! 1. Tool pre-approved in the caller's context: approve, skip everything else
//! 2. Tool not in the registry: approve (`"No approval required"`)
//! 3. Otherwise ask the active callback with the tool's risk level
//! 4. Callback error, panic or timeout: deny
//! 5. Callback answer is normalized (non-empty reason) and returned

mod builder;
mod execute;
mod request;

pub use builder::ApprovalGateBuilder;
pub use execute::{GatedResult, DENIAL_PREFIX};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::events::{GateEvent, GateHook, HookId};
use crate::permission::{
    ApprovalCallback, ApprovalContext, CallbackRegistry, PreApprovalStore, RiskLevel,
    RiskRegistry, SessionId,
};

/// Gate that decides whether a tool call may run.
///
/// # Example
///
/// ```rust
/// use toolgate_core::{ApprovalGate, AutoDeny, RiskLevel};
///
/// # tokio_test::block_on(async {
/// let gate = ApprovalGate::builder()
///     .with_callback(AutoDeny::with_reason("read-only mode"))
///     .require("deploy", RiskLevel::Critical)
///     .build();
///
/// let ctx = gate.new_context();
/// let args = serde_json::json!({"env": "prod"});
///
/// let decision = gate.request_approval(&ctx, "deploy", &args).await;
/// assert!(!decision.approved);
/// assert_eq!(decision.reason, "read-only mode");
///
/// // Tools without a requirement run freely
/// let decision = gate.request_approval(&ctx, "read_file", &args).await;
/// assert!(decision.approved);
/// # });
/// ```
pub struct ApprovalGate {
    pub(super) registry: Arc<RiskRegistry>,
    pub(super) callbacks: CallbackRegistry,
    pub(super) pre_approvals: Arc<PreApprovalStore>,
    pub(super) callback_timeout: Option<Duration>,
    pub(super) hooks: parking_lot::RwLock<Vec<(HookId, Arc<dyn GateHook>)>>,
    pub(super) next_hook_id: AtomicU64,
}

impl ApprovalGate {
    /// A gate with the built-in requirements and the console callback.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new gate builder
    pub fn builder() -> ApprovalGateBuilder {
        ApprovalGateBuilder::new()
    }

    // ===== Risk Registry =====

    /// The risk registry shared by this gate.
    pub fn registry(&self) -> &Arc<RiskRegistry> {
        &self.registry
    }

    /// Require approval for a tool, replacing any previous level.
    pub fn add_requirement(&self, tool: impl Into<String>, level: RiskLevel) {
        self.registry.add_requirement(tool, level);
    }

    /// Stop requiring approval for a tool. Unknown tools are ignored.
    pub fn remove_requirement(&self, tool: &str) {
        self.registry.remove_requirement(tool);
    }

    pub fn is_required(&self, tool: &str) -> bool {
        self.registry.is_required(tool)
    }

    pub fn risk_level_of(&self, tool: &str) -> Option<RiskLevel> {
        self.registry.risk_level_of(tool)
    }

    // ===== Decision Callback =====

    /// Replace the active decision callback.
    ///
    /// Takes effect for requests that have not yet reached the callback step.
    pub fn set_callback(&self, callback: impl ApprovalCallback + 'static) {
        self.callbacks.set(callback);
    }

    /// Replace the active decision callback with a shared one.
    pub fn set_shared_callback(&self, callback: Arc<dyn ApprovalCallback>) {
        self.callbacks.set_arc(callback);
    }

    /// The active decision callback.
    pub fn callback(&self) -> Arc<dyn ApprovalCallback> {
        self.callbacks.get()
    }

    /// How long a callback may take before the request is denied.
    pub fn callback_timeout(&self) -> Option<Duration> {
        self.callback_timeout
    }

    // ===== Pre-Approval Contexts =====

    /// Context for a caller-chosen session.
    pub fn context(&self, session: SessionId) -> ApprovalContext {
        ApprovalContext::new(session, Arc::clone(&self.pre_approvals))
    }

    /// Context for a fresh, randomly named session.
    pub fn new_context(&self) -> ApprovalContext {
        self.context(SessionId::new())
    }

    /// The single process-wide context, for callers that do not track sessions.
    pub fn default_context(&self) -> ApprovalContext {
        self.context(SessionId::process_default())
    }

    /// Forget every pre-approval in every session.
    pub fn clear_all_contexts(&self) {
        self.pre_approvals.clear_all();
    }

    // ===== Event Hooks =====

    /// Add an event hook to observe approvals and tool executions
    ///
    /// Returns an id that can be passed to [`ApprovalGate::remove_hook`].
    pub fn add_hook(&self, hook: impl GateHook + 'static) -> HookId {
        let id = HookId(self.next_hook_id.fetch_add(1, Ordering::Relaxed));
        self.hooks.write().push((id, Arc::new(hook)));
        id
    }

    /// Remove a previously added hook. Returns `false` if it was not found.
    pub fn remove_hook(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.write();
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        hooks.len() < before
    }

    /// Emit an event to all registered hooks
    pub(crate) fn emit_event(&self, event: GateEvent) {
        // Snapshot so hooks may add or remove hooks without deadlocking
        let hooks: Vec<_> = self
            .hooks
            .read()
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect();
        for hook in hooks {
            hook.on_event(&event);
        }
    }
}

impl Default for ApprovalGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApprovalGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalGate")
            .field("requirements", &self.registry.len())
            .field("callback", &self.callbacks.get().name())
            .field("callback_timeout", &self.callback_timeout)
            .field("hooks", &self.hooks.read().len())
            .finish()
    }
}
