//! Enumerate the containers defined in a built definition tree.

use crate::error::{Error, Result};
use crate::layout::DefinitionLayout;
use crate::types::ContainerName;
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

/// List the container names defined under `root`, sorted and deduplicated.
///
/// Fails with [`Error::NoDefinitionsFound`] when the units directory holds no
/// container units, since installing nothing almost always means the build
/// produced the wrong tree.
pub fn load_names(layout: &DefinitionLayout, root: &Path) -> Result<Vec<ContainerName>> {
    let units_dir = layout.units_dir(root);
    if !units_dir.is_dir() {
        return Err(Error::NoDefinitionsFound(root.to_path_buf()));
    }

    let mut names = BTreeSet::new();
    for entry in WalkDir::new(&units_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .map(Error::Io)
                .unwrap_or_else(|| Error::NoDefinitionsFound(root.to_path_buf()))
        })?;
        let file_name = entry.file_name().to_string_lossy();
        if let Some(name) = layout.name_from_unit(&file_name) {
            names.insert(ContainerName::new(name)?);
        }
    }

    if names.is_empty() {
        return Err(Error::NoDefinitionsFound(root.to_path_buf()));
    }

    log::debug!("Found {} container definitions in {}", names.len(), root.display());
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch_unit(root: &Path, file: &str) {
        let dir = root.join("etc/systemd/system");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file), "[Unit]\n").unwrap();
    }

    #[test]
    fn test_load_names_sorted() {
        let temp = TempDir::new().unwrap();
        touch_unit(temp.path(), "container@web.service");
        touch_unit(temp.path(), "container@db.service");
        touch_unit(temp.path(), "container@.service");
        touch_unit(temp.path(), "network-setup.service");

        let names = load_names(&DefinitionLayout::default(), temp.path()).unwrap();
        let names: Vec<_> = names.iter().map(ContainerName::as_str).collect();
        assert_eq!(names, vec!["db", "web"]);
    }

    #[test]
    fn test_no_definitions_found() {
        let temp = TempDir::new().unwrap();
        let err = load_names(&DefinitionLayout::default(), temp.path()).unwrap_err();
        assert!(matches!(err, Error::NoDefinitionsFound(_)));

        touch_unit(temp.path(), "sshd.service");
        let err = load_names(&DefinitionLayout::default(), temp.path()).unwrap_err();
        assert!(matches!(err, Error::NoDefinitionsFound(_)));
    }

    #[test]
    fn test_dotted_container_name_rejected() {
        let temp = TempDir::new().unwrap();
        touch_unit(temp.path(), "container@foo.service");
        touch_unit(temp.path(), "container@foo.conf.service");

        let err = load_names(&DefinitionLayout::default(), temp.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidName { ref name, .. } if name == "foo.conf"));
    }

    #[test]
    fn test_unit_symlinks_are_listed() {
        let temp = TempDir::new().unwrap();
        let store = temp.path().join("store-unit");
        fs::write(&store, "[Unit]\n").unwrap();
        let dir = temp.path().join("etc/systemd/system");
        fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink(&store, dir.join("container@web.service")).unwrap();

        let names = load_names(&DefinitionLayout::default(), temp.path()).unwrap();
        assert_eq!(names, vec![ContainerName::new("web").unwrap()]);
    }
}
