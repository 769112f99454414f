//! Risk registry: which tools need approval, and how risky they are.

use super::risk::RiskLevel;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tools that require approval out of the box.
///
/// Installed by [`RiskRegistry::new`]. Use [`RiskRegistry::empty`] (or
/// `ApprovalGate::builder().without_default_requirements()`) to start from
/// nothing.
pub const DEFAULT_REQUIREMENTS: &[(&str, RiskLevel)] = &[
    // Command and code execution
    ("execute_command", RiskLevel::Critical),
    ("kill_process", RiskLevel::Critical),
    ("execute_code", RiskLevel::Critical),
    // Destructive file and data operations
    ("write_file", RiskLevel::High),
    ("delete_file", RiskLevel::High),
    ("move_file", RiskLevel::High),
    ("copy_file", RiskLevel::High),
    ("execute_query", RiskLevel::High),
    // Network and evaluation
    ("evaluate", RiskLevel::Medium),
    ("crawl", RiskLevel::Medium),
    ("scrape_page", RiskLevel::Medium),
];

/// A single registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequirement {
    /// Tool identifier this entry applies to.
    pub tool: String,
    /// Declared risk of the tool.
    pub risk_level: RiskLevel,
}

impl ApprovalRequirement {
    pub fn new(tool: impl Into<String>, risk_level: RiskLevel) -> Self {
        Self {
            tool: tool.into(),
            risk_level,
        }
    }
}

/// Mapping from tool identifier to declared risk level.
///
/// A tool with no entry needs no approval. All operations take a short
/// lock and never block on anything else, so the registry can be mutated
/// while approval callbacks are waiting on a human.
///
/// # Example
///
/// ```rust
/// use toolgate_core::permission::{RiskLevel, RiskRegistry};
///
/// let registry = RiskRegistry::new();
/// assert_eq!(registry.risk_level_of("execute_command"), Some(RiskLevel::Critical));
///
/// registry.add_requirement("send_email", RiskLevel::Medium);
/// assert!(registry.is_required("send_email"));
///
/// registry.remove_requirement("send_email");
/// assert!(!registry.is_required("send_email"));
/// ```
#[derive(Debug)]
pub struct RiskRegistry {
    entries: RwLock<HashMap<String, RiskLevel>>,
}

impl RiskRegistry {
    /// Create a registry pre-populated with [`DEFAULT_REQUIREMENTS`].
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.add_all(
            DEFAULT_REQUIREMENTS
                .iter()
                .map(|(tool, level)| ApprovalRequirement::new(*tool, *level)),
        );
        registry
    }

    /// Create a registry with no entries.
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Require approval for a tool, replacing any previous level.
    ///
    /// Returns the level that was replaced, if any.
    pub fn add_requirement(&self, tool: impl Into<String>, level: RiskLevel) -> Option<RiskLevel> {
        self.entries.write().insert(tool.into(), level)
    }

    /// Insert several entries under a single lock.
    pub fn add_all(&self, requirements: impl IntoIterator<Item = ApprovalRequirement>) {
        let mut entries = self.entries.write();
        for req in requirements {
            entries.insert(req.tool, req.risk_level);
        }
    }

    /// Stop requiring approval for a tool.
    ///
    /// Returns `true` if an entry was removed. Removing an unknown tool is
    /// not an error.
    pub fn remove_requirement(&self, tool: &str) -> bool {
        self.entries.write().remove(tool).is_some()
    }

    /// Whether the tool has an entry.
    pub fn is_required(&self, tool: &str) -> bool {
        self.entries.read().contains_key(tool)
    }

    /// The tool's declared risk, or `None` if it needs no approval.
    pub fn risk_level_of(&self, tool: &str) -> Option<RiskLevel> {
        self.entries.read().get(tool).copied()
    }

    /// All entries, highest risk first, then by name.
    pub fn requirements(&self) -> Vec<ApprovalRequirement> {
        let mut reqs: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(tool, level)| ApprovalRequirement::new(tool.clone(), *level))
            .collect();
        reqs.sort_by(|a, b| {
            b.risk_level
                .cmp(&a.risk_level)
                .then_with(|| a.tool.cmp(&b.tool))
        });
        reqs
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove every entry, including the defaults.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for RiskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
