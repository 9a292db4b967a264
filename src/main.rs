mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

use crate::config::Settings;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub settings: Settings,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let settings = match cli.command {
        Command::Completions { .. } => Settings::default(),
        _ => Settings::load()?,
    };
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        settings,
    };

    match cli.command {
        Command::Create(args) => commands::create::run(&ctx, &args)?,
        Command::Build(args) => commands::build::run(&ctx, &args)?,
        Command::List { json } => commands::list::run(&ctx, json)?,
        Command::Restart { names } => commands::restart::run(&ctx, &names)?,
        Command::Destroy { names, all } => commands::destroy::run(&ctx, &names, all)?,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "xcon", &mut io::stdout());
        }
        Command::Forward(args) => {
            let code = commands::forward::run(&ctx, &args)?;
            return Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)));
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print a fatal error, with advice when it comes from the reconciler.
fn report(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));
    if let Some(kit) = err.downcast_ref::<containerkit::Error>() {
        let category = kit.category();
        ui::dim(&format!("{}: {}", category.description(), category.advice()));
    }
}
