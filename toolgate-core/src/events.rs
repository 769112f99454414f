use std::time::Duration;

use serde_json::Value;

use crate::permission::{DecisionSource, RiskLevel, SessionId};
use crate::tool::ToolResult;

/// Events emitted while the gate evaluates and runs tool calls
///
/// These events allow observers to audit approvals and track tool
/// executions in real-time.
#[derive(Debug, Clone)]
pub enum GateEvent {
    // ===== Approval Events =====
    /// A call needs a verdict from the active callback
    ApprovalRequired {
        /// Session the call belongs to
        session: SessionId,
        /// Tool name
        tool_name: String,
        /// Tool input parameters
        params: Value,
        /// Registered risk of the tool
        risk_level: RiskLevel,
    },

    /// A call was approved
    ApprovalGranted {
        session: SessionId,
        tool_name: String,
        /// Why no prompt was needed, or that the callback approved
        source: DecisionSource,
        reason: String,
    },

    /// A call was denied (by the callback, or because the callback failed)
    ApprovalDenied {
        session: SessionId,
        tool_name: String,
        /// Reason for denial
        reason: String,
    },

    // ===== Tool Lifecycle =====
    /// Tool execution actually starting (after approval)
    ToolExecuting {
        session: SessionId,
        /// Tool name
        name: String,
    },

    /// Tool execution completed successfully
    ToolCompleted {
        session: SessionId,
        /// Tool name
        name: String,
        /// Tool output
        output: ToolResult,
        /// Execution duration
        duration: Duration,
    },

    /// Tool execution failed
    ToolFailed {
        session: SessionId,
        /// Tool name
        name: String,
        /// Error message
        error: String,
        /// How long before failure
        duration: Duration,
    },
}

impl GateEvent {
    /// Tool the event is about.
    pub fn tool_name(&self) -> &str {
        match self {
            GateEvent::ApprovalRequired { tool_name, .. }
            | GateEvent::ApprovalGranted { tool_name, .. }
            | GateEvent::ApprovalDenied { tool_name, .. } => tool_name,
            GateEvent::ToolExecuting { name, .. }
            | GateEvent::ToolCompleted { name, .. }
            | GateEvent::ToolFailed { name, .. } => name,
        }
    }
}

/// Hook for observing gate events
///
/// Implement this trait to receive notifications about approvals and tool
/// executions.
///
/// # Example
/// ```
/// use toolgate_core::events::{GateEvent, GateHook};
///
/// struct AuditLog;
///
/// impl GateHook for AuditLog {
///     fn on_event(&self, event: &GateEvent) {
///         match event {
///             GateEvent::ApprovalDenied { tool_name, reason, .. } => {
///                 println!("denied {}: {}", tool_name, reason);
///             }
///             GateEvent::ToolExecuting { name, .. } => {
///                 println!("running {}", name);
///             }
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait GateHook: Send + Sync {
    /// Called when an event occurs
    fn on_event(&self, event: &GateEvent);
}

/// Blanket implementation for closures
impl<F> GateHook for F
where
    F: Fn(&GateEvent) + Send + Sync,
{
    fn on_event(&self, event: &GateEvent) {
        self(event)
    }
}

/// Unique identifier for a registered hook.
///
/// Used to remove hooks via [`crate::ApprovalGate::remove_hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub(crate) u64);
