//! Containers installed by this tool.

use crate::conf::{CompareConfig, ContainerConf};
use crate::error::Result;
use crate::layout::Layout;
use crate::types::ContainerName;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// An installed container as found on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryEntry {
    pub name: ContainerName,
    /// Where the installed unit link points, if it resolves
    pub unit: Option<PathBuf>,
    /// System path recorded in the installed config
    pub system: Option<String>,
}

impl InventoryEntry {
    /// Whether the installed links are intact.
    pub fn is_complete(&self) -> bool {
        self.unit.is_some() && self.system.is_some()
    }
}

/// List the installed containers, sorted by name.
pub fn list_installed(layout: &Layout, compare: &CompareConfig) -> Result<Vec<InventoryEntry>> {
    layout
        .host
        .installed_names()?
        .into_iter()
        .map(|name| {
            let installed = layout.installed(&name);
            let unit = fs::canonicalize(&installed.unit_link).ok();
            let system = match ContainerConf::load(&installed.config_link) {
                Ok(conf) => conf.get(&compare.system_path_key).map(str::to_string),
                Err(e) => {
                    log::debug!("Reading config of {name}: {e}");
                    None
                }
            };
            Ok(InventoryEntry { name, unit, system })
        })
        .collect()
}
