//! Top-level error types for toolgate
//!
//! Denials are not errors: they come back as data
//! ([`crate::ApprovalDecision`] / [`crate::GatedResult::Denied`]). This type
//! covers the remaining failures callers need to handle.

use thiserror::Error;

use crate::config::ConfigError;
use crate::tool::ToolError;

/// Top-level error type for toolgate operations
///
/// - [`Error::Config`] - Fix the policy file or builder settings
/// - [`Error::Tool`] - The approved tool itself failed
/// - [`Error::ToolNotFound`] - The agent asked for a tool that is not registered
/// - [`Error::InvalidToolInput`] - The agent sent arguments that are not a JSON object
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (unreadable or malformed policy file)
    #[error("configuration error: {0}")]
    Config(String),

    /// Tool execution failed
    #[error("tool error: {0}")]
    Tool(String),

    /// Tool not registered
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Tool input is not a JSON object
    #[error("invalid tool input: {0}")]
    InvalidToolInput(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns true if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a tool error
    pub fn is_tool(&self) -> bool {
        matches!(self, Self::Tool(_))
    }

    /// Returns true if the tool was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ToolNotFound(_))
    }

    /// Returns true if the tool input was rejected
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidToolInput(_))
    }
}

impl From<ToolError> for Error {
    fn from(err: ToolError) -> Self {
        Self::Tool(err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for toolgate operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tool_error() {
        let err: Error = ToolError::Custom("boom".into()).into();
        assert!(err.is_tool());
        assert_eq!(err.to_string(), "tool error: boom");
    }

    #[test]
    fn test_from_config_error() {
        let err: Error = ConfigError::Invalid("bad".into()).into();
        assert!(err.is_config());
    }

    #[test]
    fn test_convenience_methods() {
        assert!(Error::Config("x".into()).is_config());
        assert!(Error::Tool("x".into()).is_tool());
        assert!(Error::ToolNotFound("x".into()).is_not_found());
        assert!(Error::InvalidToolInput("x".into()).is_invalid_input());
        assert!(!Error::Other("x".into()).is_tool());
    }
}
