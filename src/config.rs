//! Host settings (`config.toml`).
//!
//! Every field is optional; missing sections fall back to the built-in
//! NixOS layout.

use anyhow::{Context, Result};
use containerkit::{CompareConfig, DefinitionLayout, HostLayout, Layout, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub host: HostSettings,
    pub definitions: DefinitionSettings,
    pub compare: CompareSettings,
    pub terminate: TerminateSettings,
    pub commands: CommandSettings,
}

/// Host directories. Values may use `~` and `$VAR`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostSettings {
    pub unit_dir: String,
    pub config_dir: String,
    pub gcroots_dir: String,
    pub state_dir: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        let host = HostLayout::default();
        Self {
            unit_dir: host.unit_dir.display().to_string(),
            config_dir: host.config_dir.display().to_string(),
            gcroots_dir: host.gcroots_dir.display().to_string(),
            state_dir: host.state_dir.display().to_string(),
        }
    }
}

/// Layout of a built definition tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefinitionSettings {
    pub units_subdir: String,
    pub configs_subdir: String,
    pub unit_prefix: String,
    pub unit_suffix: String,
}

impl Default for DefinitionSettings {
    fn default() -> Self {
        let defs = DefinitionLayout::default();
        Self {
            units_subdir: defs.units_subdir.display().to_string(),
            configs_subdir: defs.configs_subdir.display().to_string(),
            unit_prefix: defs.unit_prefix,
            unit_suffix: defs.unit_suffix,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareSettings {
    pub system_path_key: String,
    pub redacted_fields: Vec<String>,
}

impl Default for CompareSettings {
    fn default() -> Self {
        let compare = CompareConfig::default();
        Self {
            system_path_key: compare.system_path_key,
            redacted_fields: compare.redacted_fields,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerminateSettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for TerminateSettings {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            max_attempts: retry.max_attempts,
            delay_ms: retry.delay.as_millis() as u64,
        }
    }
}

/// External programs, looked up in `PATH` unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandSettings {
    pub systemctl: String,
    pub machinectl: String,
    pub nixos_container: String,
    pub nix_build: String,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            systemctl: "systemctl".to_string(),
            machinectl: "machinectl".to_string(),
            nixos_container: "nixos-container".to_string(),
            nix_build: "nix-build".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the resolved config file, or defaults if there is none.
    pub fn load() -> Result<Self> {
        match paths::config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                log::debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let settings = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)?;
        if settings.terminate.max_attempts == 0 {
            anyhow::bail!("terminate.max_attempts must be at least 1");
        }
        let definitions = &settings.definitions;
        if definitions.unit_prefix.is_empty() && definitions.unit_suffix.is_empty() {
            anyhow::bail!("definitions.unit_prefix and unit_suffix cannot both be empty");
        }
        Ok(settings)
    }

    pub fn layout(&self) -> Layout {
        Layout {
            definitions: DefinitionLayout {
                units_subdir: self.definitions.units_subdir.clone().into(),
                configs_subdir: self.definitions.configs_subdir.clone().into(),
                unit_prefix: self.definitions.unit_prefix.clone(),
                unit_suffix: self.definitions.unit_suffix.clone(),
            },
            host: HostLayout {
                unit_dir: paths::expand(&self.host.unit_dir),
                config_dir: paths::expand(&self.host.config_dir),
                gcroots_dir: paths::expand(&self.host.gcroots_dir),
                state_dir: paths::expand(&self.host.state_dir),
            },
        }
    }

    pub fn compare(&self) -> CompareConfig {
        CompareConfig {
            system_path_key: self.compare.system_path_key.clone(),
            redacted_fields: self.compare.redacted_fields.clone(),
        }
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new(
            self.terminate.max_attempts,
            Duration::from_millis(self.terminate.delay_ms),
        )
    }
}
