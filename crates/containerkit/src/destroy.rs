//! Remove installed containers from the host.

use crate::backend::{ContainerRuntime, ServiceManager};
use crate::error::Result;
use crate::install::remove_if_present;
use crate::layout::Layout;
use crate::types::{ContainerName, join_names};
use serde::Serialize;

/// What a destroy run removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DestroyReport {
    pub destroyed: Vec<ContainerName>,
    /// Requested names this tool never installed
    pub not_installed: Vec<ContainerName>,
    /// Containers whose runtime state could not be destroyed, with the reason
    pub runtime_failures: Vec<(ContainerName, String)>,
}

/// Whether `name` was installed by this tool.
pub fn is_installed(layout: &Layout, name: &ContainerName) -> bool {
    let installed = layout.installed(name);
    installed.unit_anchor.is_symlink() || installed.unit_link.is_symlink()
}

/// Stop and remove `names`.
///
/// Links and anchors are always removed. Runtime failures are collected in
/// the report; the service manager is reloaded once at the end.
pub fn destroy(
    layout: &Layout,
    services: &dyn ServiceManager,
    runtime: &dyn ContainerRuntime,
    names: &[ContainerName],
) -> Result<DestroyReport> {
    let mut report = DestroyReport::default();
    let (present, missing): (Vec<ContainerName>, Vec<ContainerName>) = names
        .iter()
        .cloned()
        .partition(|name| is_installed(layout, name));

    for name in &missing {
        log::warn!("{name} is not installed, skipping");
    }
    report.not_installed = missing;

    if present.is_empty() {
        return Ok(report);
    }

    if let Err(e) = services.stop(&present) {
        log::warn!("Stopping {} failed: {e}", join_names(&present));
    }

    let mut units_removed = false;
    for name in &present {
        let installed = layout.installed(name);
        units_removed |= remove_if_present(&installed.unit_link)?;

        if let Err(e) = runtime.destroy(name) {
            log::warn!("Destroying {name} failed: {e}");
            report.runtime_failures.push((name.clone(), e.to_string()));
        }

        remove_if_present(&installed.config_link)?;
        remove_if_present(&installed.unit_anchor)?;
        remove_if_present(&installed.config_anchor)?;

        log::info!("Destroyed {name}");
        report.destroyed.push(name.clone());
    }

    if units_removed {
        services.reload()?;
    }

    Ok(report)
}
