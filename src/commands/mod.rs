//! Command implementations.

pub mod build;
pub mod create;
pub mod destroy;
pub mod forward;
pub mod list;
pub mod restart;

use anyhow::Result;
use containerkit::backend::nixos::{NixBuild, NixosContainer};
use containerkit::backend::systemd::SystemdBackend;
use containerkit::{
    Backends, CompareConfig, Controller, HostLock, Layout, RetryConfig, ThreadSleeper,
    require_root,
};

use crate::config::Settings;

/// The host's layout and backends as configured.
pub struct Host {
    pub layout: Layout,
    pub compare: CompareConfig,
    pub retry: RetryConfig,
    pub systemd: SystemdBackend,
    pub runtime: NixosContainer,
    pub builder: NixBuild,
}

impl Host {
    pub fn new(settings: &Settings) -> Self {
        let layout = settings.layout();
        let commands = &settings.commands;
        Self {
            systemd: SystemdBackend::new(
                commands.systemctl.clone(),
                commands.machinectl.clone(),
                layout.definitions.clone(),
            ),
            runtime: NixosContainer::new(commands.nixos_container.clone()),
            builder: NixBuild::new(commands.nix_build.clone()),
            compare: settings.compare(),
            retry: settings.retry(),
            layout,
        }
    }

    pub fn backends(&self) -> Backends<'_> {
        Backends {
            services: &self.systemd,
            machines: &self.systemd,
            runtime: &self.runtime,
            sleeper: &ThreadSleeper,
        }
    }

    pub fn controller(&self) -> Controller<'_> {
        Controller::new(&self.layout, &self.compare, self.retry, self.backends())
    }

    /// Check privileges and take the host lock before changing anything.
    pub fn lock_for(&self, operation: &str) -> Result<HostLock> {
        require_root(operation)?;
        let lock = HostLock::acquire(&self.layout.host.state_dir)?;
        log::debug!("Holding {} for {operation}", lock.path().display());
        Ok(lock)
    }
}
