//! `xcon build`: build the definitions and preview what `create` would change.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use containerkit::backend::{BuildRequest, BuildSource, Builder, PathOverride};
use containerkit::{ChangeClass, Comparison, Layout};
use std::fs;
use std::path::{Path, PathBuf};

use super::Host;
use crate::Context;
use crate::cli::BuildArgs;
use crate::{progress, ui};

pub fn run(ctx: &Context, args: &BuildArgs) -> Result<()> {
    let host = Host::new(&ctx.settings);
    let root = build_root(ctx, &host, args)?;
    println!("{}", root.display());

    let comparison = host.controller().preview(&root)?;
    if !ctx.quiet {
        render_comparison(&comparison);
        if ctx.verbose > 0 {
            show_config_diffs(&host.layout, &root, &comparison);
        }
    }
    Ok(())
}

/// Run the builder and return the root of the built tree.
pub fn build_root(ctx: &Context, host: &Host, args: &BuildArgs) -> Result<PathBuf> {
    let request = request(args)?;
    let pb = progress::spinner("Building containers...", ctx.quiet);

    match host.builder.build(&request) {
        Ok(root) => {
            progress::finish_success(&pb, "Build complete");
            Ok(root)
        }
        Err(e) => {
            progress::finish_error(&pb, "Build failed");
            Err(e.into())
        }
    }
}

fn request(args: &BuildArgs) -> Result<BuildRequest> {
    let source = match (&args.expr, &args.file) {
        (Some(expr), _) => BuildSource::Expr(expr.clone()),
        (None, Some(file)) => BuildSource::File(
            fs::canonicalize(file)
                .with_context(|| format!("Could not find {}", file.display()))?,
        ),
        (None, None) => anyhow::bail!("Either a file or --expr is required"),
    };

    let overrides = args
        .nixos_path
        .iter()
        .map(|path| PathOverride {
            name: "nixpkgs".to_string(),
            path: path.clone(),
        })
        .collect();

    Ok(BuildRequest {
        source,
        attr: args.attr.clone(),
        overrides,
        extra_args: args.builder_args.clone(),
    })
}

/// Print the classification of every desired container.
pub fn render_comparison(comparison: &Comparison) {
    ui::section("Containers");
    for (name, class) in comparison.iter() {
        ui::classified(name.as_str(), class);
    }
}

/// Show how the config of each changed container differs from the installed one.
fn show_config_diffs(layout: &Layout, root: &Path, comparison: &Comparison) {
    for (name, class) in comparison.iter() {
        if class == ChangeClass::Unchanged {
            continue;
        }
        let desired = layout.definitions.config_path(root, name);
        let installed = layout.installed(name).config_link;

        ui::section(&format!("{name} config"));
        if !installed.exists() {
            ui::dim("(not installed)");
            continue;
        }
        show_text_diff(&installed, &desired);
    }
}

fn show_text_diff(a: &Path, b: &Path) {
    let (Ok(text_a), Ok(text_b)) = (fs::read_to_string(a), fs::read_to_string(b)) else {
        ui::dim("(config unreadable)");
        return;
    };

    let diff = similar::TextDiff::from_lines(&text_a, &text_b);
    let mut has_changes = false;

    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Delete => {
                has_changes = true;
                print!("    {}", format!("- {change}").red());
            }
            similar::ChangeTag::Insert => {
                has_changes = true;
                print!("    {}", format!("+ {change}").green());
            }
            similar::ChangeTag::Equal => {}
        }
    }

    if !has_changes {
        ui::dim("(config identical, unit changed)");
    }
}
