//! `xcon create`: build, install and optionally bring containers up to date.

use anyhow::Result;
use containerkit::{Actions, ContainerName, PassReport};

use super::{Host, build};
use crate::Context;
use crate::cli::CreateArgs;
use crate::ui;

pub fn run(ctx: &Context, args: &CreateArgs) -> Result<()> {
    let host = Host::new(&ctx.settings);
    let _lock = host.lock_for("create")?;

    let root = build::build_root(ctx, &host, &args.build)?;
    let actions = Actions {
        start: args.start,
        update: args.update,
        restart: args.restart,
    };
    let report = host.controller().reconcile(&root, actions)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !ctx.quiet {
        render(&report);
    }
    Ok(())
}

fn render(report: &PassReport) {
    build::render_comparison(&report.comparison);
    println!();

    if report.install.is_empty() {
        ui::info("All containers are up to date");
    } else {
        ui::success(&format!(
            "Installed {} container(s){}",
            report.install.installed.len(),
            if report.install.reload_required {
                ", reloaded units"
            } else {
                ""
            }
        ));
    }

    if report.plan.has_actions() {
        ui::section("Actions");
        ui::action("started", names(report.plan.start.iter()));
        ui::action("updated", names(report.plan.update.iter()));
        ui::action("restarted", names(report.plan.restart.iter()));
    }

    for name in &report.failed_updates {
        ui::warn(&format!("{name} could not be updated; restart it to apply"));
    }
}

fn names<'a>(iter: impl Iterator<Item = &'a ContainerName>) -> impl Iterator<Item = &'a str> {
    iter.map(ContainerName::as_str)
}
