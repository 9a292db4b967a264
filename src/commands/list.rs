//! `xcon list`: show containers installed by xcon.

use anyhow::Result;
use colored::Colorize;
use containerkit::backend::ServiceManager;
use containerkit::inventory::{InventoryEntry, list_installed};
use containerkit::{ContainerName, RunStatus};
use serde::Serialize;
use std::collections::BTreeMap;

use super::Host;
use crate::Context;
use crate::ui;

#[derive(Serialize)]
struct Row<'a> {
    #[serde(flatten)]
    entry: &'a InventoryEntry,
    status: Option<RunStatus>,
}

pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let host = Host::new(&ctx.settings);
    let entries = list_installed(&host.layout, &host.compare)?;

    let names: Vec<ContainerName> = entries.iter().map(|e| e.name.clone()).collect();
    let status = host.systemd.status(&names).unwrap_or_else(|e| {
        log::warn!("Could not query container status: {e}");
        BTreeMap::new()
    });

    let rows: Vec<Row<'_>> = entries
        .iter()
        .map(|entry| Row {
            entry,
            status: status.get(&entry.name).copied(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        if !ctx.quiet {
            ui::info("No containers installed");
        }
        return Ok(());
    }

    for row in &rows {
        let status = match row.status {
            Some(RunStatus::Active) => "active".green(),
            Some(RunStatus::Inactive) => "inactive".dimmed(),
            None => "unknown".yellow(),
        };
        let system = match (&row.entry.system, row.entry.is_complete()) {
            (Some(system), true) => system.as_str().normal(),
            _ => "broken install".red(),
        };
        println!("{:<24} {:<10} {}", row.entry.name.as_str(), status, system);
    }
    Ok(())
}
