//! Policy files: declarative registry configuration.
//!
//! ```json
//! {
//!   "includeDefaults": true,
//!   "callbackTimeoutSecs": 300,
//!   "requirements": { "deploy": "critical", "send_email": "medium" },
//!   "exempt": ["crawl"]
//! }
//! ```
//!
//! Every field is optional. Unknown risk levels are skipped with a warning
//! rather than failing the load.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::permission::{ApprovalRequirement, RiskLevel, RiskRegistry, DEFAULT_REQUIREMENTS};

/// Errors that can occur while loading a policy.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The policy file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The policy file is not valid JSON of the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The policy is well-formed but unusable.
    #[error("invalid policy: {0}")]
    Invalid(String),
}

/// Policy file format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyFile {
    /// Keep the built-in dangerous tool list (default: true)
    #[serde(default = "default_true")]
    pub include_defaults: bool,
    /// Deny when the callback has not answered within this many seconds
    #[serde(default)]
    pub callback_timeout_secs: Option<u64>,
    /// Map of tool name to risk level
    #[serde(default)]
    pub requirements: BTreeMap<String, String>,
    /// Tools that never need approval, even if built in
    #[serde(default)]
    pub exempt: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// A validated policy, ready to apply to a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct GatePolicy {
    pub include_defaults: bool,
    pub callback_timeout: Option<Duration>,
    pub requirements: Vec<ApprovalRequirement>,
    pub exempt: Vec<String>,
    /// Entries dropped because their risk level did not parse.
    pub skipped: Vec<String>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            include_defaults: true,
            callback_timeout: None,
            requirements: Vec::new(),
            exempt: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl GatePolicy {
    /// Validate a parsed policy file.
    pub fn from_file(file: PolicyFile) -> Result<Self, ConfigError> {
        if file.callback_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "callbackTimeoutSecs must be greater than zero".to_string(),
            ));
        }

        let mut requirements = Vec::new();
        let mut skipped = Vec::new();
        for (tool, level) in file.requirements {
            match level.parse::<RiskLevel>() {
                Ok(level) => requirements.push(ApprovalRequirement::new(tool, level)),
                Err(e) => {
                    tracing::warn!("Skipping requirement for '{}': {}", tool, e);
                    skipped.push(tool);
                }
            }
        }

        Ok(Self {
            include_defaults: file.include_defaults,
            callback_timeout: file.callback_timeout_secs.map(Duration::from_secs),
            requirements,
            exempt: file.exempt,
            skipped,
        })
    }

    /// Apply this policy to a registry.
    ///
    /// Order: drop built-ins (if excluded), add requirements, then remove
    /// exemptions, so an exemption always wins.
    pub fn apply_to(&self, registry: &RiskRegistry) {
        if !self.include_defaults {
            for (tool, _) in DEFAULT_REQUIREMENTS {
                registry.remove_requirement(tool);
            }
        }
        registry.add_all(self.requirements.iter().cloned());
        for tool in &self.exempt {
            registry.remove_requirement(tool);
        }
    }
}

/// Parse a policy from a JSON string.
pub fn parse_policy(json: &str) -> Result<GatePolicy, ConfigError> {
    if json.trim().is_empty() {
        return Ok(GatePolicy::default());
    }
    let file: PolicyFile = serde_json::from_str(json)?;
    GatePolicy::from_file(file)
}

/// Load a policy from a JSON file.
///
/// The path is expanded with shell tilde expansion (e.g. `~/.toolgate.json`).
pub async fn load_policy_file(path: impl AsRef<Path>) -> Result<GatePolicy, ConfigError> {
    let path_str = path.as_ref().to_string_lossy().to_string();
    let expanded_path = shellexpand::tilde(&path_str);
    let path = Path::new(expanded_path.as_ref());

    tracing::debug!("Loading approval policy from {}", path.display());
    let content = tokio::fs::read_to_string(path).await?;
    parse_policy(&content)
}
