//! NixOS backends: `nixos-container` as runtime and `nix-build` as builder.

use super::command::{run, run_checked, run_inherit};
use super::{BuildRequest, BuildSource, Builder, CommandOutput, ContainerRuntime};
use crate::error::{Error, Result};
use crate::types::ContainerName;
use std::path::PathBuf;

/// Container runtime backed by the `nixos-container` CLI.
pub struct NixosContainer {
    program: String,
}

impl NixosContainer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ContainerRuntime for NixosContainer {
    fn run(&self, name: &ContainerName, command: &[String]) -> Result<CommandOutput> {
        let args: Vec<String> = ["run".to_string(), name.to_string(), "--".to_string()]
            .into_iter()
            .chain(command.iter().cloned())
            .collect();
        run(&self.program, &args)
    }

    fn destroy(&self, name: &ContainerName) -> Result<()> {
        run_checked(&self.program, &["destroy".to_string(), name.to_string()])?;
        Ok(())
    }

    fn passthrough(&self, args: &[String]) -> Result<i32> {
        run_inherit(&self.program, args)
    }
}

/// Builder backed by `nix-build`.
pub struct NixBuild {
    program: String,
}

impl NixBuild {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Command line arguments for a build request.
pub fn build_args(request: &BuildRequest) -> Vec<String> {
    let mut args = Vec::new();
    match &request.source {
        BuildSource::File(path) => args.push(path.display().to_string()),
        BuildSource::Expr(expr) => {
            args.push("-E".to_string());
            args.push(expr.clone());
        }
    }
    if let Some(attr) = &request.attr {
        args.push("-A".to_string());
        args.push(attr.clone());
    }
    for over in &request.overrides {
        args.push("-I".to_string());
        args.push(format!("{}={}", over.name, over.path.display()));
    }
    args.push("--no-out-link".to_string());
    args.extend(request.extra_args.iter().cloned());
    args
}

impl Builder for NixBuild {
    fn build(&self, request: &BuildRequest) -> Result<PathBuf> {
        let output = run_checked(&self.program, &build_args(request)).map_err(|e| match e {
            Error::CommandFailed { stderr, .. } => Error::BuildFailed(stderr),
            other => other,
        })?;

        output
            .stdout_str()
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| Error::BuildFailed("builder printed no output path".to_string()))
    }
}
