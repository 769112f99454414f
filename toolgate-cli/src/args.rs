//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Inspect and exercise tool approval policies
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Policy file to apply on top of the built-in requirements
    #[arg(long, global = true, env = "TOOLGATE_POLICY")]
    pub policy: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tools that require approval, highest risk first
    List {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Ask the gate whether a single tool call may run
    ///
    /// Prints the decision as JSON. Exits 0 when approved and 1 when denied.
    Check {
        /// Tool name
        tool: String,

        /// Call arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// Who decides calls that need approval
        #[arg(long, value_enum, default_value_t = Mode::Console, env = "TOOLGATE_MODE")]
        mode: Mode,

        /// Deny if no decision arrives within this many seconds
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
    },
}

/// Decision strategy for `check`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Prompt on the terminal
    Console,
    /// Approve everything
    Approve,
    /// Deny everything
    Deny,
}
