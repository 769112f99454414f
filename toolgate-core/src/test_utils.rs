//! Test doubles for exercising the gate.
//!
//! Enabled for this crate's own tests and, for downstream crates, with the
//! `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! toolgate-core = { version = "0.4", features = ["test-utils"] }
//! ```

use std::io::{self, BufReader, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::permission::{
    ApprovalCallback, ApprovalDecision, ApprovalRequest, CallbackError, RiskLevel,
};
use crate::tool::{Tool, ToolError, ToolResult};

/// Callback that answers with a fixed decision and records every request.
#[derive(Debug)]
pub struct RecordingCallback {
    decision: ApprovalDecision,
    requests: parking_lot::Mutex<Vec<ApprovalRequest>>,
}

impl RecordingCallback {
    pub fn new(decision: ApprovalDecision) -> Arc<Self> {
        Arc::new(Self {
            decision,
            requests: parking_lot::Mutex::new(Vec::new()),
        })
    }

    pub fn approving() -> Arc<Self> {
        Self::new(ApprovalDecision::approve("recorded approval"))
    }

    pub fn denying() -> Arc<Self> {
        Self::new(ApprovalDecision::deny("recorded denial"))
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<ApprovalRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ApprovalCallback for RecordingCallback {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError> {
        self.requests.lock().push(request.clone());
        Ok(self.decision.clone())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Callback that always returns an error.
#[derive(Debug, Clone)]
pub struct FailingCallback {
    message: String,
}

impl FailingCallback {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ApprovalCallback for FailingCallback {
    async fn decide(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError> {
        Err(CallbackError::Failed(self.message.clone()))
    }
}

/// Callback that panics.
#[derive(Debug, Clone, Copy)]
pub struct PanickingCallback;

#[async_trait]
impl ApprovalCallback for PanickingCallback {
    async fn decide(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError> {
        panic!("approver crashed")
    }
}

/// Callback that approves after a delay.
#[derive(Debug, Clone)]
pub struct SlowCallback {
    delay: Duration,
}

impl SlowCallback {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ApprovalCallback for SlowCallback {
    async fn decide(&self, _request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError> {
        tokio::time::sleep(self.delay).await;
        Ok(ApprovalDecision::approve("approved after delay"))
    }

    fn name(&self) -> &str {
        "slow"
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CountingInput {
    /// Echoed back as the tool output
    #[serde(default)]
    pub value: String,
}

/// Tool that echoes `value` and counts how often it actually ran.
#[derive(Debug, Clone)]
pub struct CountingTool {
    name: String,
    risk_level: Option<RiskLevel>,
    calls: Arc<AtomicUsize>,
}

impl CountingTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            risk_level: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_risk(mut self, level: RiskLevel) -> Self {
        self.risk_level = Some(level);
        self
    }

    /// Number of executions, shared between clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Tool for CountingTool {
    type Input = CountingInput;

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Echoes its input and counts executions"
    }

    fn risk_level(&self) -> Option<RiskLevel> {
        self.risk_level
    }

    async fn execute(&self, input: Self::Input) -> Result<ToolResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolResult::text(input.value))
    }
}

/// In-memory terminal for driving a [`ConsoleApprover`](crate::ConsoleApprover).
///
/// Lines typed on the returned [`TerminalKeys`] become readable on the
/// reader, which blocks until then like a real terminal. Dropping the keys
/// ends the input.
pub fn terminal_pipe() -> (TerminalKeys, BufReader<TerminalInput>) {
    let (tx, rx) = mpsc::channel();
    let input = TerminalInput {
        typed: rx,
        pending: Vec::new(),
        pos: 0,
    };
    (TerminalKeys(tx), BufReader::new(input))
}

/// Typing end of [`terminal_pipe`].
#[derive(Debug, Clone)]
pub struct TerminalKeys(mpsc::Sender<Vec<u8>>);

impl TerminalKeys {
    pub fn type_line(&self, line: &str) {
        let _ = self.0.send(format!("{}\n", line).into_bytes());
    }
}

/// Reading end of [`terminal_pipe`].
#[derive(Debug)]
pub struct TerminalInput {
    typed: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl Read for TerminalInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.pending.len() {
            match self.typed.recv() {
                Ok(bytes) => {
                    self.pending = bytes;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Output sink whose contents can be read back from any clone.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput(Arc<parking_lot::Mutex<Vec<u8>>>);

impl CapturedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
