//! Backend abstraction for the host's external collaborators.
//!
//! The reconciliation engine only talks to the outside world through these
//! traits, enabling:
//! - Real execution via `systemctl`, `machinectl`, `nixos-container` and `nix-build`
//! - Recording fakes in tests

pub mod command;
pub mod nixos;
pub mod systemd;

use crate::error::Result;
use crate::types::{ContainerName, RunStatus};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use command::CommandOutput;

/// The service manager owning the container units.
pub trait ServiceManager {
    /// Start the units of all `names` in one call.
    fn start(&self, names: &[ContainerName]) -> Result<()>;

    /// Stop the units of all `names` in one call.
    fn stop(&self, names: &[ContainerName]) -> Result<()>;

    /// Query run status of all `names` in one call.
    ///
    /// Names missing from the returned map could not be queried; callers
    /// treat them as inactive.
    fn status(&self, names: &[ContainerName]) -> Result<BTreeMap<ContainerName, RunStatus>>;

    /// Reload unit definitions and wait for the reload to finish.
    fn reload(&self) -> Result<()>;
}

/// Result of asking the machine supervisor to terminate machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// All machines were terminated
    Terminated,
    /// At least one machine was not known to the supervisor
    AlreadyGone(Vec<String>),
    /// Termination failed for another reason
    Failed(String),
}

/// The supervisor of the machines backing containers.
pub trait MachineSupervisor {
    /// Terminate the machines of all `names` in one call.
    fn terminate(&self, names: &[ContainerName]) -> TerminateOutcome;
}

/// The container runtime.
pub trait ContainerRuntime {
    /// Run a command inside a running container.
    fn run(&self, name: &ContainerName, command: &[String]) -> Result<CommandOutput>;

    /// Destroy a container and its state.
    fn destroy(&self, name: &ContainerName) -> Result<()>;

    /// Hand `args` to the runtime's own CLI unchanged and return its exit code.
    fn passthrough(&self, args: &[String]) -> Result<i32>;
}

/// What to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildSource {
    /// A file containing the container definitions
    File(PathBuf),
    /// An inline expression
    Expr(String),
}

/// A search path override handed to the builder (`-I name=path`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOverride {
    pub name: String,
    pub path: PathBuf,
}

/// Request to build a definition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub source: BuildSource,
    /// Attribute selecting the containers inside the source
    pub attr: Option<String>,
    pub overrides: Vec<PathOverride>,
    /// Arguments passed through to the builder unchanged
    pub extra_args: Vec<String>,
}

/// The external builder producing definition trees.
pub trait Builder {
    /// Build and return the root of the definition tree.
    fn build(&self, request: &BuildRequest) -> Result<PathBuf>;
}
