//! Config file resolution for xcon
//!
//! # Environment Variables
//!
//! - `XCON_CONFIG` - Path of the config file to use
//!
//! # Resolution Priority
//!
//! 1. `XCON_CONFIG` environment variable (must exist)
//! 2. `$XDG_CONFIG_HOME/xcon/config.toml` (usually `~/.config/xcon/config.toml`)
//! 3. `/etc/xcon/config.toml`
//! 4. None: built-in defaults

use std::path::{Path, PathBuf};

/// Environment variable for the config file override
pub const ENV_CONFIG: &str = "XCON_CONFIG";

/// System-wide config file
pub const SYSTEM_CONFIG: &str = "/etc/xcon/config.toml";

/// Resolve the config file, if any.
pub fn config_file() -> Option<PathBuf> {
    resolve_config(
        std::env::var(ENV_CONFIG).ok().as_deref(),
        dirs::config_dir().map(|dir| dir.join("xcon").join("config.toml")),
        Path::new(SYSTEM_CONFIG),
    )
}

fn resolve_config(
    env_value: Option<&str>,
    user_config: Option<PathBuf>,
    system_config: &Path,
) -> Option<PathBuf> {
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        let path = expand(value);
        log::debug!("Using config from {ENV_CONFIG}: {}", path.display());
        return Some(path);
    }

    if let Some(path) = user_config.filter(|p| p.is_file()) {
        log::debug!("Using user config: {}", path.display());
        return Some(path);
    }

    if system_config.is_file() {
        log::debug!("Using system config: {}", system_config.display());
        return Some(system_config.to_path_buf());
    }

    None
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as they are.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
