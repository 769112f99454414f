//! Risk levels attached to tools.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Qualitative severity of a tool.
///
/// Levels are ordered (`Low < Medium < High < Critical`). The gate uses a
/// single approve/deny answer regardless of level; the level is passed to
/// the decision callback for display and policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Read-mostly or otherwise benign side effects.
    Low,
    /// Network access or moderate side effects.
    Medium,
    /// Destructive filesystem or data changes.
    High,
    /// Arbitrary command or code execution.
    Critical,
}

impl RiskLevel {
    /// All levels, lowest first.
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// Lowercase name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// ANSI color escape used when rendering the level on a terminal.
    pub(crate) fn ansi_color(&self) -> &'static str {
        match self {
            RiskLevel::Low => "\x1b[34m",
            RiskLevel::Medium => "\x1b[33m",
            RiskLevel::High => "\x1b[31m",
            RiskLevel::Critical => "\x1b[1;31m",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known risk level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown risk level '{0}' (expected low, medium, high or critical)")]
pub struct ParseRiskLevelError(pub String);

impl FromStr for RiskLevel {
    type Err = ParseRiskLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(ParseRiskLevelError(s.to_string())),
        }
    }
}
