//! Classify desired containers against what is installed.
//!
//! Classification only reads the filesystem. Paths are compared after
//! resolving symlinks, so a container is unchanged exactly when its installed
//! links resolve to the same store paths the new build produced.

use crate::conf::{CompareConfig, ContainerConf};
use crate::error::Result;
use crate::layout::Layout;
use crate::types::{ChangeClass, ContainerDefinition, ContainerName, InstalledContainer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Classification of every desired container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    classes: BTreeMap<ContainerName, ChangeClass>,
}

impl Comparison {
    /// Classification of `name`, if it is desired.
    pub fn class(&self, name: &ContainerName) -> Option<ChangeClass> {
        self.classes.get(name).copied()
    }

    /// Iterate over `(name, class)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&ContainerName, ChangeClass)> {
        self.classes.iter().map(|(name, class)| (name, *class))
    }

    /// Names of containers that are not unchanged.
    pub fn changed(&self) -> impl Iterator<Item = &ContainerName> {
        self.iter()
            .filter(|(_, class)| class.is_changed())
            .map(|(name, _)| name)
    }

    /// Whether every container is unchanged.
    pub fn is_unchanged(&self) -> bool {
        self.changed().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl FromIterator<(ContainerName, ChangeClass)> for Comparison {
    fn from_iter<I: IntoIterator<Item = (ContainerName, ChangeClass)>>(iter: I) -> Self {
        Self {
            classes: iter.into_iter().collect(),
        }
    }
}

/// Classify each of `names` in the definition tree at `root`.
pub fn classify(
    layout: &Layout,
    compare: &CompareConfig,
    root: &Path,
    names: &[ContainerName],
) -> Result<Comparison> {
    names
        .iter()
        .map(|name| {
            let desired = layout.definitions.definition(root, name);
            let installed = layout.installed(name);
            let class = classify_one(&desired, &installed, compare)?;
            log::debug!("{name}: {}", class.label());
            Ok((name.clone(), class))
        })
        .collect()
}

/// Classify a single container.
pub fn classify_one(
    desired: &ContainerDefinition,
    installed: &InstalledContainer,
    compare: &CompareConfig,
) -> Result<ChangeClass> {
    let desired_unit = resolve(&desired.unit);
    let installed_unit = resolve(&installed.unit_link);

    let same_unit = desired_unit.is_some() && desired_unit == installed_unit;
    if !same_unit {
        return Ok(ChangeClass::FullyChanged);
    }

    let (Some(desired_config), Some(installed_config)) =
        (resolve(&desired.config), resolve(&installed.config_link))
    else {
        return Ok(ChangeClass::FullyChanged);
    };

    if desired_config == installed_config {
        return Ok(ChangeClass::Unchanged);
    }

    let desired_conf = ContainerConf::load(&desired_config)?.redacted(&compare.redacted_fields);
    let installed_conf =
        ContainerConf::load(&installed_config)?.redacted(&compare.redacted_fields);

    if desired_conf == installed_conf {
        Ok(ChangeClass::ConfigOnlyChanged)
    } else {
        Ok(ChangeClass::FullyChanged)
    }
}

/// Canonical path of `path`, or `None` if it doesn't resolve.
fn resolve(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path).ok()
}
