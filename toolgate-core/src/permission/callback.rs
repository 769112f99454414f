//! Decision callbacks and the slot holding the active one.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::console::ConsoleApprover;
use super::decision::{ApprovalDecision, ApprovalRequest};

/// Errors a decision callback can report.
///
/// The gate never propagates these: any callback error becomes a denial.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// The callback could not reach a verdict.
    #[error("{0}")]
    Failed(String),

    /// The callback was cancelled before answering.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// IO error while talking to the approver (terminal, socket, ...).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<String> for CallbackError {
    fn from(s: String) -> Self {
        Self::Failed(s)
    }
}

impl From<&str> for CallbackError {
    fn from(s: &str) -> Self {
        Self::Failed(s.to_string())
    }
}

/// Strategy that approves or denies a tool call.
///
/// Implementations may answer immediately (policy lookup) or wait as long as
/// they need (human at a terminal, remote approval service). Only the call
/// awaiting the answer is held up.
///
/// Plain closures taking `&ApprovalRequest` and returning an
/// [`ApprovalDecision`] implement this trait.
///
/// # Example
///
/// ```rust
/// use toolgate_core::permission::{ApprovalCallback, ApprovalDecision, ApprovalRequest, RiskLevel};
///
/// let policy = |req: &ApprovalRequest| {
///     if req.risk_level >= RiskLevel::High {
///         ApprovalDecision::deny("high risk tools are disabled")
///     } else {
///         ApprovalDecision::approve("low risk")
///     }
/// };
///
/// fn assert_callback(_: &impl ApprovalCallback) {}
/// assert_callback(&policy);
/// ```
#[async_trait]
pub trait ApprovalCallback: Send + Sync {
    /// Decide whether the requested call may run.
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        "custom"
    }
}

#[async_trait]
impl<F> ApprovalCallback for F
where
    F: Fn(&ApprovalRequest) -> ApprovalDecision + Send + Sync,
{
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError> {
        Ok(self(request))
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Approves every request.
#[derive(Debug, Clone, Default)]
pub struct AutoApprove {
    reason: Option<String>,
}

impl AutoApprove {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom reason on every approval.
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
impl ApprovalCallback for AutoApprove {
    async fn decide(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError> {
        Ok(ApprovalDecision::approve(
            self.reason.as_deref().unwrap_or("Auto-approved"),
        ))
    }

    fn name(&self) -> &str {
        "auto-approve"
    }
}

/// Denies every request.
#[derive(Debug, Clone, Default)]
pub struct AutoDeny {
    reason: Option<String>,
}

impl AutoDeny {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom reason on every denial.
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
impl ApprovalCallback for AutoDeny {
    async fn decide(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError> {
        Ok(ApprovalDecision::deny(
            self.reason.as_deref().unwrap_or("Auto-denied"),
        ))
    }

    fn name(&self) -> &str {
        "auto-deny"
    }
}

/// Holds the single active callback.
///
/// Replacing the callback swaps one `Arc` under a write lock, so readers see
/// either the old or the new callback and never an empty slot. Requests
/// already holding the old callback finish with it.
pub struct CallbackRegistry {
    active: RwLock<Arc<dyn ApprovalCallback>>,
}

impl CallbackRegistry {
    /// Start with the interactive [`ConsoleApprover`].
    pub fn new() -> Self {
        Self::with_callback(ConsoleApprover::new())
    }

    pub fn with_callback(callback: impl ApprovalCallback + 'static) -> Self {
        Self {
            active: RwLock::new(Arc::new(callback)),
        }
    }

    /// Replace the active callback.
    pub fn set(&self, callback: impl ApprovalCallback + 'static) {
        self.set_arc(Arc::new(callback));
    }

    /// Replace the active callback with a shared one.
    pub fn set_arc(&self, callback: Arc<dyn ApprovalCallback>) {
        *self.active.write() = callback;
    }

    /// The active callback.
    pub fn get(&self) -> Arc<dyn ApprovalCallback> {
        Arc::clone(&self.active.read())
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("active", &self.active.read().name())
            .finish()
    }
}
