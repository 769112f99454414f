//! `toolgate`: inspect and exercise tool approval policies from the shell.
//!
//! ```bash
//! # What needs approval with my policy?
//! toolgate list --policy ~/.toolgate.json
//!
//! # Would this call be allowed? (exit status 0 = approved, 1 = denied, 2 = error)
//! toolgate check execute_command --args '{"command": "make"}'
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=toolgate_core=debug` for decision traces.

mod args;
mod commands;
mod error;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let policy = commands::load_policy(cli.policy.as_deref())
        .await
        .context("could not load policy")?;

    // Buffered so the console prompt can use the terminal while we wait
    let mut out = Vec::new();
    let code = match cli.command {
        Commands::List { json } => {
            commands::list(policy, json, &mut out)?;
            ExitCode::SUCCESS
        }
        Commands::Check {
            tool,
            args,
            mode,
            timeout,
        } => {
            let approved = commands::check(policy, &tool, &args, mode, timeout, &mut out).await?;
            if approved {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
    };

    std::io::stdout()
        .write_all(&out)
        .context("could not write output")?;
    Ok(code)
}
