//! `list` and `check` subcommands

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use toolgate_core::{
    load_policy_file, ApprovalDecision, ApprovalGate, ApprovalGateBuilder, AutoApprove, AutoDeny,
    ConsoleApprover, GatePolicy, RiskLevel,
};

use crate::args::Mode;
use crate::error::CliError;

/// Load the policy file if one was given.
pub async fn load_policy(path: Option<&Path>) -> Result<Option<GatePolicy>, CliError> {
    let Some(path) = path else {
        return Ok(None);
    };
    let policy = load_policy_file(path).await?;
    tracing::debug!(
        path = %path.display(),
        requirements = policy.requirements.len(),
        exempt = policy.exempt.len(),
        "loaded policy"
    );
    Ok(Some(policy))
}

fn base_builder(policy: Option<GatePolicy>) -> ApprovalGateBuilder {
    let builder = ApprovalGate::builder();
    match policy {
        Some(policy) => builder.with_policy(policy),
        None => builder,
    }
}

/// Print registry entries, highest risk first.
pub fn list(policy: Option<GatePolicy>, json: bool, out: &mut impl Write) -> Result<(), CliError> {
    let gate = base_builder(policy).with_callback(AutoDeny::new()).build();
    let requirements = gate.registry().requirements();

    if json {
        serde_json::to_writer_pretty(&mut *out, &requirements)?;
        writeln!(out)?;
        return Ok(());
    }

    if requirements.is_empty() {
        writeln!(out, "No tools require approval.")?;
        return Ok(());
    }

    for requirement in &requirements {
        writeln!(
            out,
            "{:<10} {}",
            requirement.risk_level.as_str(),
            requirement.tool
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    tool: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_level: Option<RiskLevel>,
    #[serde(flatten)]
    decision: &'a ApprovalDecision,
}

/// Evaluate a single call and print the decision. Returns whether it was approved.
pub async fn check(
    policy: Option<GatePolicy>,
    tool: &str,
    args: &str,
    mode: Mode,
    timeout: Option<u64>,
    out: &mut impl Write,
) -> Result<bool, CliError> {
    let arguments: Value =
        serde_json::from_str(args).map_err(|e| CliError::InvalidArgs(e.to_string()))?;
    if !arguments.is_object() {
        return Err(CliError::InvalidArgs(format!("got {}", arguments)));
    }

    let mut builder = base_builder(policy);
    builder = match mode {
        Mode::Console => builder.with_callback(ConsoleApprover::new()),
        Mode::Approve => builder.with_callback(AutoApprove::with_reason("Approved by --mode approve")),
        Mode::Deny => builder.with_callback(AutoDeny::with_reason("Denied by --mode deny")),
    };
    if let Some(secs) = timeout {
        builder = builder.with_callback_timeout(Duration::from_secs(secs));
    }
    let gate = builder.build();

    let ctx = gate.default_context();
    let decision = gate.request_approval(&ctx, tool, &arguments).await;
    tracing::debug!(
        tool,
        ?mode,
        approved = decision.approved,
        reason = %decision.reason,
        "check finished"
    );

    let report = CheckReport {
        tool,
        risk_level: gate.risk_level_of(tool),
        decision: &decision,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;

    Ok(decision.approved)
}
