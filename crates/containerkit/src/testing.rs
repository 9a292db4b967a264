//! Recording fakes for the backend traits.

use crate::backend::{
    CommandOutput, ContainerRuntime, MachineSupervisor, ServiceManager, TerminateOutcome,
};
use crate::error::{Error, Result};
use crate::terminate::Sleeper;
use crate::types::{ContainerName, RunStatus, join_names};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

pub(crate) fn name(s: &str) -> ContainerName {
    ContainerName::new(s).unwrap()
}

pub(crate) fn names(list: &[&str]) -> Vec<ContainerName> {
    list.iter().map(|n| name(n)).collect()
}

/// One fake standing in for the service manager, machine supervisor and
/// container runtime, logging every call in order.
#[derive(Default)]
pub(crate) struct FakeHost {
    pub calls: RefCell<Vec<String>>,
    pub active: RefCell<BTreeSet<ContainerName>>,
    pub terminate_outcomes: RefCell<VecDeque<TerminateOutcome>>,
    pub terminate_calls: Cell<u32>,
    pub fail_stop: bool,
    pub fail_status: bool,
    pub fail_reload: bool,
    pub fail_update: BTreeSet<ContainerName>,
    pub fail_destroy: BTreeSet<ContainerName>,
}

impl FakeHost {
    pub fn with_active(list: &[&str]) -> Self {
        let host = Self::default();
        host.active.borrow_mut().extend(names(list));
        host
    }

    pub fn push_outcome(&self, outcome: TerminateOutcome) {
        self.terminate_outcomes.borrow_mut().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl ServiceManager for FakeHost {
    fn start(&self, names: &[ContainerName]) -> Result<()> {
        self.record(format!("start {}", join_names(names)));
        self.active.borrow_mut().extend(names.iter().cloned());
        Ok(())
    }

    fn stop(&self, names: &[ContainerName]) -> Result<()> {
        self.record(format!("stop {}", join_names(names)));
        if self.fail_stop {
            return Err(Error::CommandFailed {
                command: "systemctl stop".to_string(),
                stderr: "unit not loaded".to_string(),
            });
        }
        let mut active = self.active.borrow_mut();
        for name in names {
            active.remove(name);
        }
        Ok(())
    }

    fn status(&self, names: &[ContainerName]) -> Result<BTreeMap<ContainerName, RunStatus>> {
        self.record(format!("status {}", join_names(names)));
        if self.fail_status {
            return Err(Error::CommandFailed {
                command: "systemctl is-active".to_string(),
                stderr: "Failed to connect to bus".to_string(),
            });
        }
        let active = self.active.borrow();
        Ok(names
            .iter()
            .map(|name| {
                let status = if active.contains(name) {
                    RunStatus::Active
                } else {
                    RunStatus::Inactive
                };
                (name.clone(), status)
            })
            .collect())
    }

    fn reload(&self) -> Result<()> {
        self.record("reload".to_string());
        if self.fail_reload {
            return Err(Error::CommandFailed {
                command: "systemctl daemon-reload".to_string(),
                stderr: "Access denied".to_string(),
            });
        }
        Ok(())
    }
}

impl MachineSupervisor for FakeHost {
    fn terminate(&self, names: &[ContainerName]) -> TerminateOutcome {
        self.terminate_calls.set(self.terminate_calls.get() + 1);
        self.record(format!("terminate {}", join_names(names)));
        let mut outcomes = self.terminate_outcomes.borrow_mut();
        if outcomes.len() > 1 {
            outcomes.pop_front().unwrap_or(TerminateOutcome::Terminated)
        } else {
            outcomes
                .front()
                .cloned()
                .unwrap_or(TerminateOutcome::Terminated)
        }
    }
}

impl ContainerRuntime for FakeHost {
    fn run(&self, name: &ContainerName, command: &[String]) -> Result<CommandOutput> {
        self.record(format!("run {name} {}", command.join(" ")));
        let success = !self.fail_update.contains(name);
        let stderr = if success {
            Vec::new()
        } else {
            b"error: activation failed\n".to_vec()
        };
        Ok(CommandOutput {
            stdout: Vec::new(),
            stderr,
            success,
        })
    }

    fn destroy(&self, name: &ContainerName) -> Result<()> {
        self.record(format!("destroy {name}"));
        if self.fail_destroy.contains(name) {
            return Err(Error::CommandFailed {
                command: format!("nixos-container destroy {name}"),
                stderr: "container is busy".to_string(),
            });
        }
        Ok(())
    }

    fn passthrough(&self, args: &[String]) -> Result<i32> {
        self.record(format!("passthrough {}", args.join(" ")));
        Ok(0)
    }
}

#[derive(Default)]
pub(crate) struct CountingSleeper {
    pub sleeps: Cell<u32>,
}

impl Sleeper for CountingSleeper {
    fn sleep(&self, _duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
    }
}
