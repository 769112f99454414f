//! Building blocks of the approval gate.
//!
//! - **[`RiskRegistry`]**: which tools need approval, at what [`RiskLevel`]
//! - **[`ApprovalCallback`]**: the pluggable approve/deny strategy
//! - **[`CallbackRegistry`]**: holds the single active callback
//! - **[`ConsoleApprover`]**: the default, interactive terminal callback
//! - **[`ApprovalContext`]**: per-session pre-approvals that bypass the callback
//! - **[`ApprovalDecision`]**: what every approval request resolves to
//!
//! These are wired together by [`crate::ApprovalGate`].
//!
//! # Default Behavior
//!
//! Tools with no registry entry run without asking. A fixed set of dangerous
//! tools ([`DEFAULT_REQUIREMENTS`]) is registered from the start, and the
//! console callback asks the operator about them.
//!
//! | Level | Built-in tools |
//! |-------|----------------|
//! | critical | `execute_command`, `kill_process`, `execute_code` |
//! | high | `write_file`, `delete_file`, `move_file`, `copy_file`, `execute_query` |
//! | medium | `evaluate`, `crawl`, `scrape_page` |

mod callback;
mod console;
mod context;
mod decision;
mod registry;
mod risk;

pub use callback::{ApprovalCallback, AutoApprove, AutoDeny, CallbackError, CallbackRegistry};
pub use console::ConsoleApprover;
pub use context::{ApprovalContext, PreApprovalStore, SessionId};
pub use decision::{
    ApprovalDecision, ApprovalRequest, DecisionSource, REASON_NOT_REQUIRED, REASON_PRE_APPROVED,
};
pub use registry::{ApprovalRequirement, RiskRegistry, DEFAULT_REQUIREMENTS};
pub use risk::{ParseRiskLevelError, RiskLevel};
