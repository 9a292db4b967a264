//! `xcon destroy`: stop and remove installed containers.

use anyhow::{Result, bail};
use containerkit::ContainerName;
use containerkit::destroy::destroy;

use super::Host;
use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, names: &[ContainerName], all: bool) -> Result<()> {
    let host = Host::new(&ctx.settings);

    let names = if all {
        host.layout.host.installed_names()?
    } else if names.is_empty() {
        bail!("No container names given; pass names or --all");
    } else {
        names.to_vec()
    };

    if names.is_empty() {
        if !ctx.quiet {
            ui::info("No containers installed");
        }
        return Ok(());
    }

    let _lock = host.lock_for("destroy")?;
    let report = destroy(&host.layout, &host.systemd, &host.runtime, &names)?;

    if ctx.quiet {
        return Ok(());
    }
    for name in &report.destroyed {
        ui::success(&format!("Destroyed {name}"));
    }
    for name in &report.not_installed {
        ui::warn(&format!("{name} is not installed by xcon"));
    }
    for (name, reason) in &report.runtime_failures {
        ui::warn(&format!("{name}: container state was not removed: {reason}"));
    }
    Ok(())
}
