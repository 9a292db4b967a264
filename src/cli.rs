use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use containerkit::ContainerName;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xcon")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Declarative NixOS containers on a mutable host",
    long_about = "Build container definitions, install what changed and bring running \
                  containers up to date.\n\nUnknown commands are passed to nixos-container."
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build and install containers, optionally starting or updating them
    Create(CreateArgs),

    /// Build containers and show what `create` would change
    Build(BuildArgs),

    /// List containers installed by xcon
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Restart containers by terminating their machines
    Restart {
        /// Containers to restart
        #[arg(required = true, value_parser = parse_name)]
        names: Vec<ContainerName>,
    },

    /// Stop and remove installed containers
    Destroy {
        /// Containers to destroy
        #[arg(value_parser = parse_name)]
        names: Vec<ContainerName>,

        /// Destroy every container installed by xcon
        #[arg(short, long, conflicts_with = "names")]
        all: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Any other command is passed to nixos-container
    #[command(external_subcommand)]
    Forward(Vec<String>),
}

/// What to build.
#[derive(Args, Clone)]
pub struct BuildArgs {
    /// File defining the containers
    #[arg(required_unless_present = "expr")]
    pub file: Option<PathBuf>,

    /// Expression defining the containers, instead of a file
    #[arg(short = 'E', long, conflicts_with = "file")]
    pub expr: Option<String>,

    /// Attribute path selecting the containers
    #[arg(short = 'A', long)]
    pub attr: Option<String>,

    /// nixpkgs checkout to build against
    #[arg(long, alias = "nixpkgs-path")]
    pub nixos_path: Option<PathBuf>,

    /// Arguments passed to the builder unchanged
    #[arg(last = true)]
    pub builder_args: Vec<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Start stopped containers and update or restart running ones that changed
    #[arg(short, long)]
    pub start: bool,

    /// Update running containers that changed, restarting those that can't be updated
    #[arg(short, long = "update-changed")]
    pub update: bool,

    /// Restart running containers that changed
    #[arg(short, long = "restart-changed")]
    pub restart: bool,

    /// Print the pass report as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_name(value: &str) -> Result<ContainerName, String> {
    ContainerName::new(value).map_err(|e| e.to_string())
}
