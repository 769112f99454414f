//! Tools the gate can guard.
//!
//! Implement [`Tool`] with a typed input, then hand it to a
//! [`Toolbox`](crate::Toolbox) or box it with [`box_tool`] for
//! [`ApprovalGate::execute_tool_with_gate`](crate::ApprovalGate::execute_tool_with_gate).

use std::future::Future;
use std::pin::Pin;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::permission::RiskLevel;

/// What a tool hands back to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolResult {
    Text(String),

    /// Structured output. Denials are reported this way too.
    Json(Value),
}

impl ToolResult {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Content as the model will read it.
    pub fn as_text(&self) -> String {
        match self {
            ToolResult::Text(s) => s.clone(),
            ToolResult::Json(v) => v.to_string(),
        }
    }
}

impl From<String> for ToolResult {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for ToolResult {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A tool ran (or tried to) and failed.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The arguments did not fit the tool's input type.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Custom(String),
}

impl From<String> for ToolError {
    fn from(s: String) -> Self {
        Self::Custom(s)
    }
}

impl From<&str> for ToolError {
    fn from(s: &str) -> Self {
        Self::Custom(s.to_string())
    }
}

/// A tool an agent can call.
///
/// The input type derives `Deserialize` for the call arguments and
/// `JsonSchema` so the tool can be advertised to a model. A tool that must
/// never run unattended declares its risk with [`Tool::risk_level`]; adding
/// it to a [`crate::Toolbox`] registers that risk before the tool can be
/// called.
///
/// # Example
///
/// ```rust
/// use toolgate_core::{RiskLevel, Tool, ToolError, ToolResult};
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct DeleteInput {
///     /// File to remove
///     path: String,
/// }
///
/// struct DeleteFile;
///
/// impl Tool for DeleteFile {
///     type Input = DeleteInput;
///
///     fn name(&self) -> &str { "delete_file" }
///     fn description(&self) -> &str { "Delete a file" }
///     fn risk_level(&self) -> Option<RiskLevel> { Some(RiskLevel::High) }
///
///     fn execute(&self, input: Self::Input) -> impl std::future::Future<Output = Result<ToolResult, ToolError>> + Send {
///         async move {
///             Ok(format!("would delete {}", input.path).into())
///         }
///     }
/// }
///
/// let schema = DeleteFile.input_schema();
/// assert_eq!(schema["required"][0], "path");
/// ```
pub trait Tool: Send + Sync {
    type Input: DeserializeOwned + JsonSchema;

    /// Identifier the model calls the tool by, and the registry key.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Risk of running this tool. `None` means it never needs approval.
    fn risk_level(&self) -> Option<RiskLevel> {
        None
    }

    fn execute(&self, input: Self::Input)
        -> impl Future<Output = Result<ToolResult, ToolError>> + Send;

    /// JSON schema of [`Tool::Input`], for advertising the tool to a model.
    fn input_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(Self::Input)).unwrap_or(Value::Null)
    }
}

/// Boxed future returned by [`DynTool::execute_raw`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<ToolResult, ToolError>> + Send + 'a>>;

/// Object-safe form of [`Tool`] taking raw JSON arguments.
///
/// Implement [`Tool`] and convert with [`box_tool`] rather than implementing
/// this directly.
pub trait DynTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn risk_level(&self) -> Option<RiskLevel>;
    fn input_schema(&self) -> Value;
    fn execute_raw(&self, input: Value) -> ToolFuture<'_>;
}

/// Type-erase a [`Tool`].
pub fn box_tool<T: Tool + 'static>(tool: T) -> Box<dyn DynTool> {
    Box::new(Typed(tool))
}

/// Box several tools of different types at once.
///
/// ```ignore
/// use toolgate_core::{box_tools, Toolbox};
///
/// let toolbox = Toolbox::new(gate).with_tools(box_tools![ShellTool, ReadFile, WriteFile]);
/// ```
#[macro_export]
macro_rules! box_tools {
    ($($tool:expr),* $(,)?) => {
        vec![$($crate::tool::box_tool($tool)),*]
    };
}

struct Typed<T>(T);

impl<T: Tool + 'static> DynTool for Typed<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn risk_level(&self) -> Option<RiskLevel> {
        self.0.risk_level()
    }

    fn input_schema(&self) -> Value {
        self.0.input_schema()
    }

    fn execute_raw(&self, input: Value) -> ToolFuture<'_> {
        Box::pin(async move {
            let input: T::Input = serde_json::from_value(input)
                .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
            self.0.execute(input).await
        })
    }
}

/// JSON type name for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
