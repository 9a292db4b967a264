//! Pass unknown commands to `nixos-container`.

use anyhow::Result;
use containerkit::backend::ContainerRuntime;

use super::Host;
use crate::Context;

/// Run `nixos-container <args>` and return its exit code.
pub fn run(ctx: &Context, args: &[String]) -> Result<i32> {
    let host = Host::new(&ctx.settings);
    Ok(host.runtime.passthrough(args)?)
}
