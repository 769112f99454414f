//! ApprovalGateBuilder for fluent gate construction

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GatePolicy;
use crate::permission::{
    ApprovalCallback, ApprovalRequirement, CallbackRegistry, PreApprovalStore, RiskLevel,
    RiskRegistry,
};

use super::ApprovalGate;

/// Builder for creating an [`ApprovalGate`]
///
/// Without any configuration the gate requires approval for the built-in
/// dangerous tools and asks the console.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use toolgate_core::{ApprovalGate, AutoApprove, RiskLevel};
///
/// let gate = ApprovalGate::builder()
///     .with_callback(AutoApprove::new())
///     .require("send_email", RiskLevel::Medium)
///     .with_callback_timeout(Duration::from_secs(60))
///     .build();
///
/// assert!(gate.is_required("send_email"));
/// assert!(gate.is_required("delete_file"));
/// ```
pub struct ApprovalGateBuilder {
    callback: Option<Arc<dyn ApprovalCallback>>,
    include_defaults: bool,
    requirements: Vec<ApprovalRequirement>,
    callback_timeout: Option<Duration>,
    policy: Option<GatePolicy>,
    registry: Option<Arc<RiskRegistry>>,
    pre_approvals: Option<Arc<PreApprovalStore>>,
}

impl Default for ApprovalGateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApprovalGateBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            callback: None,
            include_defaults: true,
            requirements: Vec::new(),
            callback_timeout: None,
            policy: None,
            registry: None,
            pre_approvals: None,
        }
    }

    /// Set the decision callback (default: [`crate::ConsoleApprover`])
    pub fn with_callback(mut self, callback: impl ApprovalCallback + 'static) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Set a decision callback that is shared with other gates
    pub fn with_shared_callback(mut self, callback: Arc<dyn ApprovalCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Start from an empty registry instead of the built-in tool list
    pub fn without_default_requirements(mut self) -> Self {
        self.include_defaults = false;
        self
    }

    /// Require approval for a tool
    pub fn require(mut self, tool: impl Into<String>, level: RiskLevel) -> Self {
        self.requirements.push(ApprovalRequirement::new(tool, level));
        self
    }

    /// Deny any request whose callback has not answered within `timeout`
    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = Some(timeout);
        self
    }

    /// Apply a loaded policy
    ///
    /// The policy is applied before requirements added with
    /// [`require`](Self::require), and its timeout is used unless
    /// [`with_callback_timeout`](Self::with_callback_timeout) is also set.
    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Use an existing registry (shared with other gates) instead of a new one
    ///
    /// Default requirements are not re-added to a shared registry.
    pub fn with_registry(mut self, registry: Arc<RiskRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use an existing pre-approval store, so sessions are shared between gates
    pub fn with_pre_approvals(mut self, store: Arc<PreApprovalStore>) -> Self {
        self.pre_approvals = Some(store);
        self
    }

    /// Build the gate
    pub fn build(self) -> ApprovalGate {
        let registry = match self.registry {
            Some(registry) => registry,
            None if self.include_defaults => Arc::new(RiskRegistry::new()),
            None => Arc::new(RiskRegistry::empty()),
        };

        let mut callback_timeout = None;
        if let Some(policy) = &self.policy {
            policy.apply_to(&registry);
            callback_timeout = policy.callback_timeout;
        }
        registry.add_all(self.requirements);

        let callbacks = match self.callback {
            Some(callback) => {
                let callbacks = CallbackRegistry::new();
                callbacks.set_arc(callback);
                callbacks
            }
            None => CallbackRegistry::new(),
        };

        let gate = ApprovalGate {
            registry,
            callbacks,
            pre_approvals: self
                .pre_approvals
                .unwrap_or_else(|| Arc::new(PreApprovalStore::new())),
            callback_timeout: self.callback_timeout.or(callback_timeout),
            hooks: parking_lot::RwLock::new(Vec::new()),
            next_hook_id: AtomicU64::new(0),
        };

        tracing::debug!(
            requirements = gate.registry.len(),
            callback = gate.callbacks.get().name(),
            "approval gate built"
        );
        gate
    }
}
