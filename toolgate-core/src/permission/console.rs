//! Interactive terminal approval.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::callback::{ApprovalCallback, CallbackError};
use super::decision::{ApprovalDecision, ApprovalRequest};

/// Prompts on the terminal for a yes/no answer.
///
/// This is the callback a gate starts with. It shows the tool, its risk
/// level and an argument preview on stderr, then reads one of:
/// - `y` / `yes`: approve once
/// - `a` / `always`: approve for the rest of the session
/// - `n` / `no`: deny
///
/// End of input denies. Prompts are shown one at a time, even across gates.
///
/// Input is read by a single background thread started with the first
/// prompt. A prompt that is dropped or times out leaves that thread running,
/// and lines typed while no prompt is showing are discarded, so a late answer
/// to one prompt is never taken as the answer to the next.
#[derive(Clone)]
pub struct ConsoleApprover {
    terminal: Arc<Terminal>,
}

impl ConsoleApprover {
    /// Prompt on stderr and read answers from stdin.
    pub fn new() -> Self {
        static STDIO: OnceLock<Arc<Terminal>> = OnceLock::new();
        let terminal = STDIO.get_or_init(|| {
            Arc::new(Terminal::new(
                Box::new(BufReader::new(io::stdin())),
                Box::new(io::stderr()),
            ))
        });
        Self {
            terminal: Arc::clone(terminal),
        }
    }

    /// Prompt on `output` and read answers from `input`.
    pub fn with_io(
        input: impl BufRead + Send + 'static,
        output: impl Write + Send + 'static,
    ) -> Self {
        Self {
            terminal: Arc::new(Terminal::new(Box::new(input), Box::new(output))),
        }
    }
}

impl Default for ConsoleApprover {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConsoleApprover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleApprover").finish_non_exhaustive()
    }
}

#[async_trait]
impl ApprovalCallback for ConsoleApprover {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision, CallbackError> {
        // Held for the whole prompt so concurrent prompts do not interleave
        let mut answers = self.terminal.answers.lock().await;
        let lines = answers.lines()?;

        // Typed while nothing was being asked
        while lines.try_recv().is_ok() {}

        self.terminal.write(&render_prompt(request))?;

        loop {
            let Some(line) = lines.recv().await else {
                self.terminal.write("\n")?;
                return Ok(ApprovalDecision::deny("No answer from console (end of input)"));
            };

            match ConsoleAnswer::parse(&line) {
                Some(answer) => {
                    let decision = answer.into_decision();
                    self.terminal.write(&format!("  {}\n", decision.reason))?;
                    return Ok(decision);
                }
                None if line.trim().is_empty() => {}
                None => self
                    .terminal
                    .write("\x1b[31mInvalid choice. Use y/a/n\x1b[0m: ")?,
            }
        }
    }

    fn name(&self) -> &str {
        "console"
    }
}

struct Terminal {
    answers: tokio::sync::Mutex<Answers>,
    output: parking_lot::Mutex<Box<dyn Write + Send>>,
}

impl Terminal {
    fn new(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self {
            answers: tokio::sync::Mutex::new(Answers {
                input: Some(input),
                lines: None,
            }),
            output: parking_lot::Mutex::new(output),
        }
    }

    fn write(&self, text: &str) -> io::Result<()> {
        let mut output = self.output.lock();
        output.write_all(text.as_bytes())?;
        output.flush()
    }
}

/// Lines read from the input, once the reader thread is running.
struct Answers {
    input: Option<Box<dyn BufRead + Send>>,
    lines: Option<mpsc::UnboundedReceiver<String>>,
}

impl Answers {
    fn lines(&mut self) -> io::Result<&mut mpsc::UnboundedReceiver<String>> {
        let lines = match self.lines.take() {
            Some(lines) => lines,
            None => spawn_reader(self.input.take())?,
        };
        Ok(self.lines.insert(lines))
    }
}

/// Forward lines from `input` until it ends or nobody is listening.
///
/// The thread is detached, so a read blocked on an idle terminal never
/// keeps the runtime or the process alive.
fn spawn_reader(
    input: Option<Box<dyn BufRead + Send>>,
) -> io::Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let Some(mut input) = input else {
        return Ok(rx);
    };

    std::thread::Builder::new()
        .name("toolgate-console".to_string())
        .spawn(move || loop {
            let mut line = String::new();
            match input.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "console input failed");
                    break;
                }
            }
        })?;

    Ok(rx)
}

/// Parsed terminal answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleAnswer {
    Once,
    Session,
    Deny,
}

impl ConsoleAnswer {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" => Some(Self::Once),
            "a" | "always" => Some(Self::Session),
            "n" | "no" => Some(Self::Deny),
            _ => None,
        }
    }

    fn into_decision(self) -> ApprovalDecision {
        match self {
            Self::Once => ApprovalDecision::approve("User approved"),
            Self::Session => ApprovalDecision::approve_for_session("User approved for session"),
            Self::Deny => ApprovalDecision::deny("User denied"),
        }
    }
}

const MAX_PREVIEW_ARGS: usize = 10;
const MAX_PREVIEW_CHARS: usize = 80;

fn render_prompt(request: &ApprovalRequest) -> String {
    let mut out = String::from("\n\x1b[33mApproval required\x1b[0m\n");
    out.push_str(&format!(
        "  risk: {}{}\x1b[0m\n",
        request.risk_level.ansi_color(),
        request.risk_level
    ));
    out.push_str(&format!("  \x1b[1m{}\x1b[0m\n", request.tool_name));

    if let Some(args) = request.arguments.as_object() {
        for (key, value) in args.iter().take(MAX_PREVIEW_ARGS) {
            out.push_str(&format!("    \x1b[2m{}:\x1b[0m {}\n", key, preview(value)));
        }
        if args.len() > MAX_PREVIEW_ARGS {
            out.push_str(&format!(
                "    \x1b[2m… +{} more\x1b[0m\n",
                args.len() - MAX_PREVIEW_ARGS
            ));
        }
    }

    out.push_str(&format!(
        "\nRun this {} risk tool? [y]es / [a]lways this session / [n]o: ",
        request.risk_level
    ));
    out
}

/// One-line rendering of an argument value.
fn preview(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().count() > MAX_PREVIEW_CHARS => {
            let head: String = s.chars().take(MAX_PREVIEW_CHARS).collect();
            format!("\"{}…\"", head)
        }
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(fields) => format!("{{{} keys}}", fields.len()),
        other => other.to_string(),
    }
}
