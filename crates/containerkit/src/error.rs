//! Error types for container reconciliation.
//!
//! Every variant here is fatal for the invocation that produced it.
//! Best-effort failures (live updates, the stop issued before terminating,
//! partially failed status queries) are logged where they happen and never
//! surface as an [`Error`].

use std::path::PathBuf;
use thiserror::Error;

/// Categories of reconciliation errors, used for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The definition tree is empty or malformed
    Definitions,
    /// Machines refused to die within the retry bound
    Termination,
    /// Missing root privilege
    Permission,
    /// Another invocation is running
    Concurrency,
    /// An external command failed
    Command,
    /// Filesystem or other I/O error
    Io,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Definitions => "Invalid container definitions",
            Self::Termination => "Container machine termination timed out",
            Self::Permission => "Permission denied",
            Self::Concurrency => "Host is locked",
            Self::Command => "External command failed",
            Self::Io => "I/O error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Definitions => "Check that the build defines at least one container",
            Self::Termination => {
                "Inspect the machine with `machinectl status` and re-run once it is gone"
            }
            Self::Permission => "Re-run as root",
            Self::Concurrency => "Wait for the other invocation to finish and try again",
            Self::Command => "Check the command output above for details",
            Self::Io => "Check permissions and free space on the host directories",
        }
    }
}

/// Errors that can occur while reconciling containers.
#[derive(Debug, Error)]
pub enum Error {
    /// The built definition tree contains no container units
    #[error("no container definitions found in {}", .0.display())]
    NoDefinitionsFound(PathBuf),

    /// A changed container lacks an artifact the build should have produced
    #[error("container {name}: expected artifact is missing: {}", .path.display())]
    MissingExpectedArtifact {
        /// Container whose artifact is missing
        name: String,
        /// Path where the artifact was expected
        path: PathBuf,
    },

    /// Machines were still alive after the last termination attempt
    #[error("failed to terminate {names} after {attempts} attempts: {last_error}")]
    TerminationTimeout {
        /// Space separated container names
        names: String,
        /// Number of termination attempts made
        attempts: u32,
        /// Message of the last failed attempt
        last_error: String,
    },

    /// The operation needs root privilege
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Another process holds the host lock
    #[error("another invocation holds the lock at {}", .0.display())]
    Locked(PathBuf),

    /// A container name failed validation
    #[error("invalid container name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// An external command exited unsuccessfully
    #[error("{command} failed: {stderr}")]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// Standard error output of the command
        stderr: String,
    },

    /// The builder did not produce a definition tree
    #[error("build failed: {0}")]
    BuildFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category for user feedback.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NoDefinitionsFound(_)
            | Error::MissingExpectedArtifact { .. }
            | Error::InvalidName { .. } => ErrorCategory::Definitions,
            Error::TerminationTimeout { .. } => ErrorCategory::Termination,
            Error::PermissionDenied(_) => ErrorCategory::Permission,
            Error::Locked(_) => ErrorCategory::Concurrency,
            Error::CommandFailed { .. } | Error::BuildFailed(_) => ErrorCategory::Command,
            Error::Io(_) => ErrorCategory::Io,
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
