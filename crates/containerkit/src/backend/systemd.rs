//! systemd backend using `systemctl` and `machinectl`.

use super::command::{run, run_checked};
use super::{MachineSupervisor, ServiceManager, TerminateOutcome};
use crate::error::Result;
use crate::layout::DefinitionLayout;
use crate::types::{ContainerName, RunStatus};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static NO_MACHINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"No machine '([^']+)' known").expect("valid regex"));

/// Backend that executes real `systemctl` and `machinectl` commands.
pub struct SystemdBackend {
    systemctl: String,
    machinectl: String,
    units: DefinitionLayout,
}

impl SystemdBackend {
    /// Create a backend. `units` supplies the container unit naming.
    pub fn new(
        systemctl: impl Into<String>,
        machinectl: impl Into<String>,
        units: DefinitionLayout,
    ) -> Self {
        Self {
            systemctl: systemctl.into(),
            machinectl: machinectl.into(),
            units,
        }
    }

    fn systemctl_args(&self, verb: &str, names: &[ContainerName]) -> Vec<String> {
        std::iter::once(verb.to_string())
            .chain(names.iter().map(|name| self.units.unit_file_name(name)))
            .collect()
    }
}

impl ServiceManager for SystemdBackend {
    fn start(&self, names: &[ContainerName]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        run_checked(&self.systemctl, &self.systemctl_args("start", names))?;
        Ok(())
    }

    fn stop(&self, names: &[ContainerName]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        run_checked(&self.systemctl, &self.systemctl_args("stop", names))?;
        Ok(())
    }

    fn status(&self, names: &[ContainerName]) -> Result<BTreeMap<ContainerName, RunStatus>> {
        if names.is_empty() {
            return Ok(BTreeMap::new());
        }
        // `is-active` exits non-zero as soon as one unit is inactive, but still
        // prints one line per unit it could query
        let output = run(&self.systemctl, &self.systemctl_args("is-active", names))?;
        Ok(parse_is_active(names, &output.stdout_str()))
    }

    fn reload(&self) -> Result<()> {
        run_checked(&self.systemctl, &["daemon-reload".to_string()])?;
        Ok(())
    }
}

impl MachineSupervisor for SystemdBackend {
    fn terminate(&self, names: &[ContainerName]) -> TerminateOutcome {
        let args: Vec<String> = std::iter::once("terminate".to_string())
            .chain(names.iter().map(ToString::to_string))
            .collect();
        match run(&self.machinectl, &args) {
            Ok(output) => classify_terminate(output.success, &output.stderr_str()),
            Err(e) => TerminateOutcome::Failed(e.to_string()),
        }
    }
}

/// Pair `systemctl is-active` output lines with the queried names.
///
/// Names without a line are left out of the map.
pub fn parse_is_active(
    names: &[ContainerName],
    stdout: &str,
) -> BTreeMap<ContainerName, RunStatus> {
    names
        .iter()
        .zip(stdout.lines())
        .map(|(name, line)| (name.clone(), RunStatus::from_is_active(line)))
        .collect()
}

/// Interpret the result of `machinectl terminate`.
///
/// `machinectl` reports machines it doesn't know with
/// `No machine '<name>' known`; that is the only failure treated as success.
pub fn classify_terminate(success: bool, stderr: &str) -> TerminateOutcome {
    if success {
        return TerminateOutcome::Terminated;
    }

    let gone: Vec<String> = NO_MACHINE
        .captures_iter(stderr)
        .map(|caps| caps[1].to_string())
        .collect();
    if !gone.is_empty() {
        return TerminateOutcome::AlreadyGone(gone);
    }

    TerminateOutcome::Failed(stderr.trim().to_string())
}
