//! Running a tool behind the gate

use std::future::Future;
use std::time::Instant;

use serde_json::{json, Value};

use crate::events::GateEvent;
use crate::permission::ApprovalContext;
use crate::tool::{DynTool, ToolError, ToolResult};

use super::ApprovalGate;

/// Prefix of the error message handed back to the agent on denial.
pub const DENIAL_PREFIX: &str = "Tool execution denied: ";

/// Outcome of a gated tool call.
#[derive(Debug)]
pub enum GatedResult {
    /// The call was approved and the tool ran (successfully or not).
    Executed(Result<ToolResult, ToolError>),

    /// The call was denied; the tool never ran.
    Denied { tool: String, reason: String },
}

impl GatedResult {
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed(_))
    }

    /// Reason for the denial, if the call was denied.
    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            Self::Denied { reason, .. } => Some(reason),
            Self::Executed(_) => None,
        }
    }

    /// Collapse into what the agent sees.
    ///
    /// A denial becomes a structured JSON payload rather than an error, so the
    /// model can read it and react:
    ///
    /// ```json
    /// {"error": "Tool execution denied: <reason>", "approval_denied": true, "tool": "<name>"}
    /// ```
    pub fn into_tool_result(self) -> Result<ToolResult, ToolError> {
        match self {
            Self::Executed(result) => result,
            Self::Denied { tool, reason } => Ok(ToolResult::Json(denial_payload(&tool, &reason))),
        }
    }
}

pub(crate) fn denial_payload(tool: &str, reason: &str) -> Value {
    json!({
        "error": format!("{}{}", DENIAL_PREFIX, reason),
        "approval_denied": true,
        "tool": tool,
    })
}

impl ApprovalGate {
    /// Request approval, then run `tool` if (and only if) it was approved.
    ///
    /// If the approver supplied replacement arguments the tool runs with
    /// those instead of `arguments`.
    pub async fn execute_tool_with_gate(
        &self,
        ctx: &ApprovalContext,
        tool_name: &str,
        arguments: Value,
        tool: &dyn DynTool,
    ) -> GatedResult {
        self.execute_with_gate(ctx, tool_name, arguments, |input| tool.execute_raw(input))
            .await
    }

    /// Like [`execute_tool_with_gate`](Self::execute_tool_with_gate), for any
    /// async function taking the JSON arguments.
    ///
    /// # Example
    ///
    /// ```rust
    /// use toolgate_core::{ApprovalGate, AutoDeny, ToolResult};
    ///
    /// # tokio_test::block_on(async {
    /// let gate = ApprovalGate::builder().with_callback(AutoDeny::new()).build();
    /// let ctx = gate.new_context();
    ///
    /// let result = gate
    ///     .execute_with_gate(&ctx, "delete_file", serde_json::json!({"path": "/tmp/x"}), |_args| async {
    ///         Ok(ToolResult::text("deleted"))
    ///     })
    ///     .await;
    ///
    /// assert!(result.is_denied());
    /// # });
    /// ```
    pub async fn execute_with_gate<F, Fut>(
        &self,
        ctx: &ApprovalContext,
        tool_name: &str,
        arguments: Value,
        run: F,
    ) -> GatedResult
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = Result<ToolResult, ToolError>>,
    {
        let decision = self.request_approval(ctx, tool_name, &arguments).await;
        if !decision.approved {
            return GatedResult::Denied {
                tool: tool_name.to_string(),
                reason: decision.reason,
            };
        }

        let input = match decision.modified_args {
            Some(modified) => {
                tracing::debug!(tool = tool_name, "running with modified arguments");
                modified
            }
            None => arguments,
        };

        self.emit_event(GateEvent::ToolExecuting {
            session: ctx.session().clone(),
            name: tool_name.to_string(),
        });

        let start = Instant::now();
        let result = run(input).await;
        let duration = start.elapsed();

        match &result {
            Ok(output) => self.emit_event(GateEvent::ToolCompleted {
                session: ctx.session().clone(),
                name: tool_name.to_string(),
                output: output.clone(),
                duration,
            }),
            Err(e) => {
                tracing::warn!(tool = tool_name, error = %e, "tool failed");
                self.emit_event(GateEvent::ToolFailed {
                    session: ctx.session().clone(),
                    name: tool_name.to_string(),
                    error: e.to_string(),
                    duration,
                });
            }
        }

        GatedResult::Executed(result)
    }
}
