//! # Toolgate
//!
//! Risk-based approval gating for the tools an AI agent can call.
//!
//! Before a tool runs, the gate decides whether the call may proceed. Tools
//! with no registered risk run freely; dangerous ones (shell commands,
//! file writes, process control) are sent to a decision callback that can
//! approve, deny, edit the arguments, or approve the tool for the rest of
//! the session.
//!
//! ## Quick Start
//!
//! ```rust
//! use toolgate_core::{ApprovalDecision, ApprovalGate, ApprovalRequest, RiskLevel};
//!
//! # tokio_test::block_on(async {
//! let gate = ApprovalGate::builder()
//!     .with_callback(|req: &ApprovalRequest| {
//!         if req.risk_level >= RiskLevel::Critical {
//!             ApprovalDecision::deny("critical tools are disabled")
//!         } else {
//!             ApprovalDecision::approve("allowed by policy")
//!         }
//!     })
//!     .build();
//!
//! let ctx = gate.new_context();
//! let args = serde_json::json!({"command": "rm -rf /"});
//!
//! let decision = gate.request_approval(&ctx, "execute_command", &args).await;
//! assert!(!decision.approved);
//!
//! let decision = gate.request_approval(&ctx, "write_file", &args).await;
//! assert!(decision.approved);
//! # });
//! ```
//!
//! ## Built-in Requirements
//!
//! | Risk       | Tools                                                              |
//! |------------|--------------------------------------------------------------------|
//! | `critical` | `execute_command`, `kill_process`, `execute_code`                  |
//! | `high`     | `write_file`, `delete_file`, `move_file`, `copy_file`, `execute_query` |
//! | `medium`   | `evaluate`, `crawl`, `scrape_page`                                 |
//!
//! Use [`ApprovalGateBuilder::without_default_requirements`] to start empty,
//! or a policy file (see [`config`]) to adjust the list.
//!
//! ## Gated Tools
//!
//! Tools implement [`Tool`] and may declare a [`RiskLevel`]. A [`Toolbox`]
//! registers that risk when the tool is added and routes every call through
//! the gate. A denied call never reaches the tool; the agent gets a JSON
//! payload explaining the denial instead.
//!
//! ## Sessions
//!
//! Pre-approvals are scoped to an [`ApprovalContext`]. Approving a tool "for
//! the session" in one context has no effect on any other.
//!
//! ## Observability
//!
//! Decisions and tool executions are logged with `tracing` and published as
//! [`GateEvent`]s to hooks added with [`ApprovalGate::add_hook`].

pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod permission;
pub mod tool;
pub mod toolbox;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{load_policy_file, parse_policy, ConfigError, GatePolicy, PolicyFile};
pub use error::{Error, Result};
pub use events::{GateEvent, GateHook, HookId};
pub use gate::{ApprovalGate, ApprovalGateBuilder, GatedResult, DENIAL_PREFIX};
pub use permission::{
    ApprovalCallback, ApprovalContext, ApprovalDecision, ApprovalRequest, ApprovalRequirement,
    AutoApprove, AutoDeny, CallbackError, CallbackRegistry, ConsoleApprover, DecisionSource,
    PreApprovalStore, RiskLevel, RiskRegistry, SessionId, DEFAULT_REQUIREMENTS,
};
pub use tool::{box_tool, DynTool, Tool, ToolError, ToolFuture, ToolResult};
pub use toolbox::{ToolCall, ToolCallOutcome, ToolInfo, Toolbox, DEFAULT_MAX_CONCURRENT_TOOLS};
