//! A set of tools that can only be called through an [`ApprovalGate`].
//!
//! Registering a tool that declares a [`RiskLevel`] adds its requirement to
//! the gate's registry at registration time, so the requirement is in place
//! before the tool can ever be called.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::gate::{ApprovalGate, GatedResult};
use crate::permission::{ApprovalContext, RiskLevel};
use crate::tool::{box_tool, json_type_name, DynTool, Tool, ToolResult};

/// Default maximum number of tool calls that run at the same time
pub const DEFAULT_MAX_CONCURRENT_TOOLS: usize = 12;

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier used to pair the result with the request
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// Information about a registered tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool's arguments
    pub input_schema: Value,
    /// Risk registered in the gate at the time of listing
    pub risk_level: Option<RiskLevel>,
}

/// Result of one call in a batch, ready to send back to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallOutcome {
    pub call_id: String,
    pub name: String,
    pub content: ToolResult,
    /// True if the tool failed or could not be run. Denials are not errors.
    pub is_error: bool,
    pub denied: bool,
    pub duration: Duration,
}

/// Registered tools plus the gate guarding them.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use toolgate_core::{ApprovalGate, AutoDeny, Toolbox, ToolCall};
/// # use toolgate_core::{RiskLevel, Tool, ToolError, ToolResult};
/// # #[derive(serde::Deserialize, schemars::JsonSchema)]
/// # struct Input { path: String }
/// # struct DeleteFile;
/// # impl Tool for DeleteFile {
/// #     type Input = Input;
/// #     fn name(&self) -> &str { "remove" }
/// #     fn description(&self) -> &str { "Remove a file" }
/// #     fn risk_level(&self) -> Option<RiskLevel> { Some(RiskLevel::High) }
/// #     async fn execute(&self, input: Input) -> Result<ToolResult, ToolError> {
/// #         Ok(ToolResult::text(input.path))
/// #     }
/// # }
///
/// # tokio_test::block_on(async {
/// let gate = Arc::new(ApprovalGate::builder().with_callback(AutoDeny::new()).build());
/// let toolbox = Toolbox::new(Arc::clone(&gate)).with_tool(DeleteFile);
///
/// // Registration added the requirement
/// assert!(gate.is_required("remove"));
///
/// let ctx = gate.new_context();
/// let call = ToolCall::new("call-1", "remove", serde_json::json!({"path": "/etc/passwd"}));
/// let result = toolbox.execute(&ctx, &call).await.unwrap();
/// assert!(result.is_denied());
/// # });
/// ```
pub struct Toolbox {
    gate: Arc<ApprovalGate>,
    tools: Vec<Box<dyn DynTool>>,
    max_concurrent_tools: usize,
}

impl Toolbox {
    pub fn new(gate: Arc<ApprovalGate>) -> Self {
        Self {
            gate,
            tools: Vec::new(),
            max_concurrent_tools: DEFAULT_MAX_CONCURRENT_TOOLS,
        }
    }

    /// The gate guarding these tools
    pub fn gate(&self) -> &Arc<ApprovalGate> {
        &self.gate
    }

    /// Set the maximum number of tools that can execute concurrently
    pub fn with_max_concurrent_tools(mut self, max: usize) -> Self {
        self.max_concurrent_tools = max.max(1);
        self
    }

    /// Add a tool (builder style)
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.add_tool(tool);
        self
    }

    /// Add several pre-boxed tools (builder style)
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Box<dyn DynTool>>) -> Self {
        self.add_tools(tools);
        self
    }

    /// Add a tool, registering its declared risk with the gate
    pub fn add_tool(&mut self, tool: impl Tool + 'static) {
        self.add_boxed_tool(box_tool(tool));
    }

    /// Add a tool with an explicit risk level, overriding what it declares
    pub fn add_tool_with_risk(&mut self, tool: impl Tool + 'static, level: RiskLevel) {
        if self.is_duplicate(tool.name()) {
            return;
        }
        self.gate.add_requirement(tool.name(), level);
        self.tools.push(box_tool(tool));
    }

    /// Add multiple pre-boxed tools
    pub fn add_tools(&mut self, tools: impl IntoIterator<Item = Box<dyn DynTool>>) {
        for tool in tools {
            self.add_boxed_tool(tool);
        }
    }

    /// Add a pre-boxed tool, registering its declared risk with the gate
    ///
    /// A second tool with an already registered name is ignored, and the
    /// first tool's risk stays in place.
    pub fn add_boxed_tool(&mut self, tool: Box<dyn DynTool>) {
        if self.is_duplicate(tool.name()) {
            return;
        }
        if let Some(level) = tool.risk_level() {
            self.gate.add_requirement(tool.name(), level);
        }
        self.tools.push(tool);
    }

    fn is_duplicate(&self, name: &str) -> bool {
        let duplicate = self.find(name).is_some();
        if duplicate {
            tracing::warn!(tool = name, "tool is already registered; ignoring the new one");
        }
        duplicate
    }

    /// List all registered tools
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
                risk_level: self.gate.risk_level_of(t.name()),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn find(&self, name: &str) -> Option<&dyn DynTool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Run one tool call through the gate.
    ///
    /// Fails only if the tool does not exist or the input is not a JSON
    /// object. Denials and tool failures come back inside [`GatedResult`].
    pub async fn execute(&self, ctx: &ApprovalContext, call: &ToolCall) -> Result<GatedResult> {
        if !call.input.is_object() {
            return Err(Error::InvalidToolInput(format!(
                "Tool input must be a JSON object, got: {}",
                json_type_name(&call.input)
            )));
        }

        let tool = self
            .find(&call.name)
            .ok_or_else(|| Error::ToolNotFound(call.name.clone()))?;

        Ok(self
            .gate
            .execute_tool_with_gate(ctx, &call.name, call.input.clone(), tool)
            .await)
    }

    /// Run a batch of tool calls concurrently (up to `max_concurrent_tools`).
    ///
    /// Each call is gated on its own, so one call waiting for a human does
    /// not hold up the others. Outcomes are returned in request order.
    pub async fn execute_batch(
        &self,
        ctx: &ApprovalContext,
        calls: &[ToolCall],
    ) -> Vec<ToolCallOutcome> {
        let futures: Vec<_> = calls
            .iter()
            .enumerate()
            .map(|(index, call)| async move {
                let start = Instant::now();
                let result = self.execute(ctx, call).await;
                (index, into_outcome(call, result, start.elapsed()))
            })
            .collect();

        let mut results: Vec<_> = stream::iter(futures)
            .buffer_unordered(self.max_concurrent_tools)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

fn into_outcome(call: &ToolCall, result: Result<GatedResult>, duration: Duration) -> ToolCallOutcome {
    let (content, is_error, denied) = match result {
        Ok(gated) => {
            let denied = gated.is_denied();
            match gated.into_tool_result() {
                Ok(content) => (content, false, denied),
                Err(e) => (ToolResult::Text(format!("Error: {}", e)), true, false),
            }
        }
        Err(e) => (ToolResult::Text(format!("Error: {}", e)), true, false),
    };

    ToolCallOutcome {
        call_id: call.id.clone(),
        name: call.name.clone(),
        content,
        is_error,
        denied,
        duration,
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox")
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("max_concurrent_tools", &self.max_concurrent_tools)
            .finish()
    }
}
