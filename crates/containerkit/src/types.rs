//! Core types for container reconciliation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A validated container identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerName(String);

impl ContainerName {
    /// Validate and wrap a container name.
    ///
    /// Names are limited to `[A-Za-z0-9_-]+`, the set `nixos-container`
    /// accepts. Gc anchors and config links append `.conf` to the name, so a
    /// dot would let two containers share a path.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            Some("only letters, digits, '-' and '_' are allowed")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::InvalidName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContainerName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ContainerName> for String {
    fn from(name: ContainerName) -> Self {
        name.0
    }
}

/// Join names with spaces for messages and command lines.
pub fn join_names<'a>(names: impl IntoIterator<Item = &'a ContainerName>) -> String {
    names
        .into_iter()
        .map(ContainerName::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A container as produced by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDefinition {
    pub name: ContainerName,
    /// Service unit inside the definition tree
    pub unit: PathBuf,
    /// Container config inside the definition tree
    pub config: PathBuf,
}

/// Paths a container occupies in the host's mutable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledContainer {
    pub name: ContainerName,
    /// Symlink in the mutable unit directory
    pub unit_link: PathBuf,
    /// Symlink in the mutable config directory
    pub config_link: PathBuf,
    /// GC root pointing at `unit_link`
    pub unit_anchor: PathBuf,
    /// GC root pointing at `config_link`
    pub config_anchor: PathBuf,
}

/// How a desired container differs from the installed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeClass {
    /// Unit and config are identical
    Unchanged,
    /// Same unit, config differs only in redacted fields (the system path)
    ConfigOnlyChanged,
    /// Anything else, including containers that are not installed yet
    FullyChanged,
}

impl ChangeClass {
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::ConfigOnlyChanged => "system changed",
            Self::FullyChanged => "changed",
        }
    }
}

/// Live state of a container's service unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Active,
    Inactive,
}

impl RunStatus {
    /// Interpret one line of `systemctl is-active` output.
    ///
    /// Only `active` counts as running; transitional and failed states do not.
    pub fn from_is_active(line: &str) -> Self {
        if line.trim() == "active" {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

/// Which lifecycle actions the caller asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actions {
    /// Start desired containers that are not running
    pub start: bool,
    /// Live-update running containers whose system changed
    pub update: bool,
    /// Restart every running container that changed
    pub restart: bool,
}

impl Actions {
    /// Whether any lifecycle action was requested.
    pub fn any(&self) -> bool {
        self.start || self.update || self.restart
    }
}

/// The outcome of partitioning the desired containers.
///
/// Every desired container lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    pub skip: BTreeSet<ContainerName>,
    pub start: BTreeSet<ContainerName>,
    pub update: BTreeSet<ContainerName>,
    pub restart: BTreeSet<ContainerName>,
}

impl ReconciliationPlan {
    /// A plan that leaves every container alone.
    pub fn skip_all<'a>(names: impl IntoIterator<Item = &'a ContainerName>) -> Self {
        Self {
            skip: names.into_iter().cloned().collect(),
            ..Default::default()
        }
    }

    /// Whether the plan performs any action.
    pub fn has_actions(&self) -> bool {
        !(self.start.is_empty() && self.update.is_empty() && self.restart.is_empty())
    }

    /// Number of containers covered by the plan.
    pub fn total(&self) -> usize {
        self.skip.len() + self.start.len() + self.update.len() + self.restart.len()
    }
}

/// Retry bound for machine termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of termination attempts
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            delay: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}
