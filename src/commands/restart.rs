//! `xcon restart`: restart containers through machine termination.

use anyhow::Result;
use containerkit::destroy::is_installed;
use containerkit::terminate::Terminator;
use containerkit::types::join_names;
use containerkit::{ContainerName, ThreadSleeper};

use super::Host;
use crate::Context;
use crate::ui;

pub fn run(ctx: &Context, names: &[ContainerName]) -> Result<()> {
    let host = Host::new(&ctx.settings);
    let _lock = host.lock_for("restart")?;

    for name in names.iter().filter(|name| !is_installed(&host.layout, name)) {
        log::info!("{name} was not installed by xcon");
    }

    Terminator::new(&host.systemd, &host.systemd, host.retry, &ThreadSleeper).restart(names)?;

    if !ctx.quiet {
        ui::success(&format!("Restarted {}", join_names(names)));
    }
    Ok(())
}
