//! Install changed container definitions into the host's mutable state.

use crate::compare::Comparison;
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::types::ContainerName;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

/// What an install pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Containers whose links were (re)written
    pub installed: Vec<ContainerName>,
    /// Whether a unit link changed, so the service manager must reload
    pub reload_required: bool,
}

impl InstallReport {
    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}

/// Link every changed container from the tree at `root` into the host.
///
/// Unchanged containers are not touched. A changed container whose config
/// artifact is missing aborts the pass with
/// [`Error::MissingExpectedArtifact`]; containers linked earlier in the same
/// pass stay installed.
pub fn install(layout: &Layout, root: &Path, comparison: &Comparison) -> Result<InstallReport> {
    let mut report = InstallReport::default();

    for name in comparison.changed() {
        let desired = layout.definitions.definition(root, name);
        let installed = layout.installed(name);

        let config_target =
            fs::canonicalize(&desired.config).map_err(|_| Error::MissingExpectedArtifact {
                name: name.to_string(),
                path: desired.config.clone(),
            })?;
        let unit_target =
            fs::canonicalize(&desired.unit).map_err(|_| Error::MissingExpectedArtifact {
                name: name.to_string(),
                path: desired.unit.clone(),
            })?;

        let unit_changed = link(&unit_target, &installed.unit_link)?;
        link(&config_target, &installed.config_link)?;
        link(&installed.unit_link, &installed.unit_anchor)?;
        link(&installed.config_link, &installed.config_anchor)?;

        log::info!("Installed {name}");
        report.reload_required |= unit_changed;
        report.installed.push(name.clone());
    }

    Ok(report)
}

/// Point the symlink at `link_path` to `target`.
///
/// Returns `false` when the link already pointed there.
pub(crate) fn link(target: &Path, link_path: &Path) -> Result<bool> {
    if link_path.is_symlink() && fs::read_link(link_path)? == target {
        return Ok(false);
    }

    if let Some(parent) = link_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Replace a stale link or a leftover regular file
    if link_path.is_symlink() || link_path.is_file() {
        fs::remove_file(link_path)?;
    }

    std::os::unix::fs::symlink(target, link_path)?;
    log::debug!("{} -> {}", link_path.display(), target.display());
    Ok(true)
}

/// Remove a file or symlink, ignoring files that are already gone.
pub(crate) fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
