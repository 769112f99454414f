//! Approval decisions and requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::SessionId;
use crate::tool::json_type_name;
use super::risk::RiskLevel;

/// Reason attached to a pre-approved call.
pub const REASON_PRE_APPROVED: &str = "pre-approved";

/// Reason attached to a call whose tool has no registry entry.
pub const REASON_NOT_REQUIRED: &str = "No approval required";

const DEFAULT_APPROVED_REASON: &str = "Approved by callback";
const DEFAULT_DENIED_REASON: &str = "Denied by callback";

/// Outcome of one approval request.
///
/// Every path through the gate produces one of these, and `reason` is never
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// Whether the tool may run.
    pub approved: bool,

    /// Human-readable justification.
    pub reason: String,

    /// Replacement arguments to run the tool with, if the approver edited them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_args: Option<Value>,

    /// Whether the approval should be remembered for the rest of the session.
    #[serde(default)]
    pub remember: bool,
}

impl ApprovalDecision {
    /// Approve this call once.
    pub fn approve(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
            modified_args: None,
            remember: false,
        }
    }

    /// Approve this call and every later call of the same tool in the session.
    pub fn approve_for_session(reason: impl Into<String>) -> Self {
        Self {
            remember: true,
            ..Self::approve(reason)
        }
    }

    /// Deny this call.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
            modified_args: None,
            remember: false,
        }
    }

    /// Run the tool with these arguments instead of the requested ones.
    pub fn with_modified_args(mut self, args: Value) -> Self {
        self.modified_args = Some(args);
        self
    }

    pub(crate) fn pre_approved() -> Self {
        Self::approve(REASON_PRE_APPROVED)
    }

    pub(crate) fn not_required() -> Self {
        Self::approve(REASON_NOT_REQUIRED)
    }

    /// Make a callback's answer well-formed.
    ///
    /// Fills in an empty reason, and drops session memory and argument edits
    /// from denials since neither has meaning there. Replacement arguments
    /// that are not a JSON object turn the approval into a denial.
    pub(crate) fn normalized(mut self) -> Self {
        if let Some(args) = self.modified_args.as_ref().filter(|args| !args.is_object()) {
            return Self::deny(format!(
                "approval callback error: modified arguments must be a JSON object, got {}",
                json_type_name(args)
            ));
        }
        if self.reason.trim().is_empty() {
            self.reason = if self.approved {
                DEFAULT_APPROVED_REASON
            } else {
                DEFAULT_DENIED_REASON
            }
            .to_string();
        }
        if !self.approved {
            self.remember = false;
            self.modified_args = None;
        }
        self
    }
}

impl From<bool> for ApprovalDecision {
    fn from(approved: bool) -> Self {
        if approved {
            Self::approve(DEFAULT_APPROVED_REASON)
        } else {
            Self::deny(DEFAULT_DENIED_REASON)
        }
    }
}

/// Everything a decision callback gets to look at.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// Tool identifier being invoked.
    pub tool_name: String,
    /// Parsed call arguments.
    pub arguments: Value,
    /// Registered risk of the tool.
    pub risk_level: RiskLevel,
    /// Session the call belongs to.
    pub session: SessionId,
}

/// How an approved call got its approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// The tool was already approved in this session.
    PreApproved,
    /// The tool has no registry entry.
    NotRequired,
    /// The active callback approved it.
    Callback,
}
