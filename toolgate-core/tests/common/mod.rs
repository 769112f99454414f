//! Common test utilities shared across test files.
//!
//! Items here may not be used by all test files, hence the module-level allow.
#![allow(dead_code)]

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use toolgate_core::{
    ApprovalCallback, ApprovalDecision, ApprovalRequest, CallbackError, GateEvent, GateHook,
    RiskLevel, Tool, ToolError, ToolResult,
};

// ===== Test Tools =====

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CommandInput {
    pub command: String,
}

/// Pretends to run shell commands and records what it was asked to run.
#[derive(Clone, Default)]
pub struct ShellTool {
    pub executed: Arc<Mutex<Vec<String>>>,
}

impl ShellTool {
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl Tool for ShellTool {
    type Input = CommandInput;

    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> &str {
        "Run a shell command"
    }

    fn risk_level(&self) -> Option<RiskLevel> {
        Some(RiskLevel::Critical)
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        self.executed.lock().unwrap().push(input.command.clone());
        Ok(ToolResult::text(format!("ran: {}", input.command)))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PathInput {
    pub path: String,
}

/// Read-only tool with no declared risk.
#[derive(Clone, Copy)]
pub struct ReadFileTool;

impl Tool for ReadFileTool {
    type Input = PathInput;

    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file"
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text(format!("contents of {}", input.path)))
    }
}

/// Tool that always fails after approval.
#[derive(Clone, Copy)]
pub struct BrokenWriteTool;

impl Tool for BrokenWriteTool {
    type Input = PathInput;

    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write a file (always fails)"
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        Err(ToolError::Custom(format!("read-only filesystem: {}", input.path)))
    }
}

// ===== Callbacks =====

/// Answers per tool name, denying anything not scripted.
#[derive(Default)]
pub struct ScriptedCallback {
    answers: HashMap<String, ApprovalDecision>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, tool: &str, decision: ApprovalDecision) -> Self {
        self.answers.insert(tool.to_string(), decision);
        self
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalCallback for ScriptedCallback {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError> {
        self.asked.lock().unwrap().push(request.tool_name.clone());
        Ok(self
            .answers
            .get(&request.tool_name)
            .cloned()
            .unwrap_or_else(|| ApprovalDecision::deny("not scripted")))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Holds every request until [`HumanInTheLoop::release`] is called,
/// like an operator who has not answered yet.
#[derive(Default)]
pub struct HumanInTheLoop {
    waiting: Notify,
    release: Notify,
}

impl HumanInTheLoop {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resolves once a request has reached the callback.
    pub async fn wait_for_request(&self) {
        self.waiting.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_waiters();
    }
}

#[async_trait]
impl ApprovalCallback for HumanInTheLoop {
    async fn decide(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError> {
        let released = self.release.notified();
        tokio::pin!(released);
        released.as_mut().enable();
        self.waiting.notify_one();
        released.await;
        Ok(ApprovalDecision::approve("User approved"))
    }

    fn name(&self) -> &str {
        "human"
    }
}

// ===== Event Collection =====

/// Hook that records every event.
#[derive(Clone, Default)]
pub struct EventCollector {
    pub events: Arc<Mutex<Vec<GateEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GateEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn denied_tools(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                GateEvent::ApprovalDenied { tool_name, .. } => Some(tool_name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn executed_tools(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                GateEvent::ToolExecuting { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl GateHook for EventCollector {
    fn on_event(&self, event: &GateEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
