//! Live updates: switch a running container to its new system in place.

use crate::backend::ContainerRuntime;
use crate::backend::command::indent;
use crate::conf::{CompareConfig, ContainerConf};
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::types::ContainerName;

/// Activate the installed system of `name` inside the running container.
///
/// The system path is read from the installed config, so the container must
/// have been installed first. A failed activation is returned as
/// [`Error::CommandFailed`] carrying the indented command output.
pub fn live_update(
    runtime: &dyn ContainerRuntime,
    layout: &Layout,
    compare: &CompareConfig,
    name: &ContainerName,
) -> Result<()> {
    let installed = layout.installed(name);
    let conf = ContainerConf::load(&installed.config_link)?;
    let Some(system) = conf.get(&compare.system_path_key) else {
        return Err(Error::MissingExpectedArtifact {
            name: name.to_string(),
            path: installed.config_link,
        });
    };

    let command = vec![
        format!("{system}/bin/switch-to-configuration"),
        "test".to_string(),
    ];
    log::info!("Updating {name} to {system}");

    let output = runtime.run(name, &command)?;
    if !output.success {
        return Err(Error::CommandFailed {
            command: format!("{} in {name}", command.join(" ")),
            stderr: format!("\n{}", indent(output.combined().trim_end(), "    ")),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::link;
    use crate::testing::{FakeHost, name};
    use std::fs;
    use tempfile::TempDir;

    fn install_config(temp: &TempDir, layout: &Layout, container: &str, text: &str) {
        let config = temp.path().join(format!("{container}.conf"));
        fs::write(&config, text).unwrap();
        link(&config, &layout.installed(&name(container)).config_link).unwrap();
    }

    #[test]
    fn test_live_update_runs_switch_to_configuration() {
        let temp = TempDir::new().unwrap();
        let layout = Layout::under(temp.path());
        install_config(&temp, &layout, "bar", "SYSTEM_PATH=/nix/store/sys-bar\n");
        let host = FakeHost::default();

        live_update(&host, &layout, &CompareConfig::default(), &name("bar")).unwrap();
        assert_eq!(
            host.calls(),
            vec!["run bar /nix/store/sys-bar/bin/switch-to-configuration test"]
        );
    }

    #[test]
    fn test_failed_activation_carries_output() {
        let temp = TempDir::new().unwrap();
        let layout = Layout::under(temp.path());
        install_config(&temp, &layout, "bar", "SYSTEM_PATH=/nix/store/sys-bar\n");
        let host = FakeHost {
            fail_update: [name("bar")].into_iter().collect(),
            ..Default::default()
        };

        let err = live_update(&host, &layout, &CompareConfig::default(), &name("bar"))
            .unwrap_err();
        assert!(err.to_string().contains("    error: activation failed"));
    }

    #[test]
    fn test_config_without_system_path() {
        let temp = TempDir::new().unwrap();
        let layout = Layout::under(temp.path());
        install_config(&temp, &layout, "bar", "PRIVATE_NETWORK=1\n");
        let host = FakeHost::default();

        let err = live_update(&host, &layout, &CompareConfig::default(), &name("bar"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingExpectedArtifact { .. }));
        assert!(host.calls().is_empty());
    }
}
