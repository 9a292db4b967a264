//! Progress indicators for long-running external commands.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Start a spinner with `message`. Hidden when `quiet` is set.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a spinner with a success mark.
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_and_clear();
    if !pb.is_hidden() {
        println!("{} {}", "✓".green(), message);
    }
}

/// Finish a spinner with a failure mark.
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.finish_and_clear();
    if !pb.is_hidden() {
        eprintln!("{} {}", "✗".red(), message);
    }
}
