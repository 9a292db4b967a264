//! Running external commands.

use crate::error::{Error, Result};
use std::process::{Command, Output, Stdio};

/// Output of an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Stdout and stderr together, for failure reports.
    pub fn combined(&self) -> String {
        let mut text = self.stdout_str();
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.stderr_str());
        text
    }
}

fn display(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Run a command and capture its output, whatever its exit status.
pub fn run(program: &str, args: &[String]) -> Result<CommandOutput> {
    log::debug!("Running {}", display(program, args));
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::CommandFailed {
            command: display(program, args),
            stderr: format!("failed to execute: {e}"),
        })?;
    Ok(output.into())
}

/// Run a command and fail unless it exits successfully.
pub fn run_checked(program: &str, args: &[String]) -> Result<CommandOutput> {
    let output = run(program, args)?;
    if !output.success {
        return Err(Error::CommandFailed {
            command: display(program, args),
            stderr: output.stderr_str().trim().to_string(),
        });
    }
    Ok(output)
}

/// Run a command with inherited stdio and return its exit code.
pub fn run_inherit(program: &str, args: &[String]) -> Result<i32> {
    log::debug!("Running {}", display(program, args));
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| Error::CommandFailed {
            command: display(program, args),
            stderr: format!("failed to execute: {e}"),
        })?;
    Ok(status.code().unwrap_or(1))
}

/// Prefix every line of `text` with `prefix`.
pub fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
