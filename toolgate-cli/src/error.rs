use thiserror::Error;
use toolgate_core::ConfigError;

/// Errors from CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error("--args must be a JSON object: {0}")]
    InvalidArgs(String),

    #[error("failed to load policy: {0}")]
    Policy(#[from] ConfigError),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}
