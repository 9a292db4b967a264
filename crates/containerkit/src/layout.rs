//! Filesystem layout of definition trees and of the host's mutable state.

use crate::error::Result;
use crate::types::{ContainerDefinition, ContainerName, InstalledContainer};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where the builder puts units and configs inside a definition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionLayout {
    /// Directory of service units, relative to the tree root
    pub units_subdir: PathBuf,
    /// Directory of container configs, relative to the tree root
    pub configs_subdir: PathBuf,
    /// Unit file name prefix, e.g. `container@`
    pub unit_prefix: String,
    /// Unit file name suffix, e.g. `.service`
    pub unit_suffix: String,
}

impl Default for DefinitionLayout {
    fn default() -> Self {
        Self {
            units_subdir: PathBuf::from("etc/systemd/system"),
            configs_subdir: PathBuf::from("etc/nixos-containers"),
            unit_prefix: "container@".to_string(),
            unit_suffix: ".service".to_string(),
        }
    }
}

impl DefinitionLayout {
    /// File name of a container's service unit.
    pub fn unit_file_name(&self, name: &ContainerName) -> String {
        format!("{}{}{}", self.unit_prefix, name, self.unit_suffix)
    }

    /// Extract the container name embedded in a unit file name.
    ///
    /// Returns `None` for files that don't follow the container unit convention,
    /// including the bare template unit (`container@.service`).
    pub fn name_from_unit<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        file_name
            .strip_prefix(self.unit_prefix.as_str())?
            .strip_suffix(self.unit_suffix.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn units_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.units_subdir)
    }

    pub fn unit_path(&self, root: &Path, name: &ContainerName) -> PathBuf {
        self.units_dir(root).join(self.unit_file_name(name))
    }

    pub fn config_path(&self, root: &Path, name: &ContainerName) -> PathBuf {
        root.join(&self.configs_subdir).join(format!("{name}.conf"))
    }

    /// Describe a container inside the definition tree at `root`.
    pub fn definition(&self, root: &Path, name: &ContainerName) -> ContainerDefinition {
        ContainerDefinition {
            name: name.clone(),
            unit: self.unit_path(root, name),
            config: self.config_path(root, name),
        }
    }
}

/// The host's mutable directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLayout {
    /// Mutable service unit directory
    pub unit_dir: PathBuf,
    /// Container config directory read by the container runtime
    pub config_dir: PathBuf,
    /// Directory of garbage-collection roots
    pub gcroots_dir: PathBuf,
    /// Directory for the lock file
    pub state_dir: PathBuf,
}

impl Default for HostLayout {
    fn default() -> Self {
        Self {
            unit_dir: PathBuf::from("/etc/systemd-mutable/system"),
            config_dir: PathBuf::from("/etc/nixos-containers"),
            gcroots_dir: PathBuf::from("/nix/var/nix/gcroots/xcon"),
            state_dir: PathBuf::from("/run/xcon"),
        }
    }
}

impl HostLayout {
    /// Paths an installed container occupies.
    pub fn installed(
        &self,
        definitions: &DefinitionLayout,
        name: &ContainerName,
    ) -> InstalledContainer {
        InstalledContainer {
            name: name.clone(),
            unit_link: self.unit_dir.join(definitions.unit_file_name(name)),
            config_link: self.config_dir.join(format!("{name}.conf")),
            unit_anchor: self.gcroots_dir.join(name.as_str()),
            config_anchor: self.gcroots_dir.join(format!("{name}.conf")),
        }
    }

    /// Containers installed by this tool, sorted by name.
    ///
    /// A container counts as installed when its unit anchor exists in the
    /// gc-root directory.
    pub fn installed_names(&self) -> Result<Vec<ContainerName>> {
        let entries = match fs::read_dir(&self.gcroots_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let file_name = entry?.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.ends_with(".conf") {
                continue;
            }
            match ContainerName::new(file_name.as_ref()) {
                Ok(name) => names.push(name),
                Err(e) => log::debug!("Ignoring gc root entry: {e}"),
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Definition and host layouts together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub definitions: DefinitionLayout,
    pub host: HostLayout,
}

impl Layout {
    /// A host layout rooted below `base`, used by tests and dry runs.
    pub fn under(base: &Path) -> Self {
        Self {
            definitions: DefinitionLayout::default(),
            host: HostLayout {
                unit_dir: base.join("units"),
                config_dir: base.join("configs"),
                gcroots_dir: base.join("gcroots"),
                state_dir: base.join("state"),
            },
        }
    }

    pub fn installed(&self, name: &ContainerName) -> InstalledContainer {
        self.host.installed(&self.definitions, name)
    }
}
