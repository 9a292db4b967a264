//! Container config files.
//!
//! Configs are shell-style `KEY=value` files. Lines that aren't assignments
//! (comments, blanks) are kept verbatim so that two configs compare equal
//! only when their text matches outside the redacted fields.

use crate::error::Result;
use std::fs;
use std::path::Path;

/// Settings for comparing container configs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareConfig {
    /// Key holding the container's system path
    pub system_path_key: String,
    /// Keys ignored when deciding whether only the system changed
    pub redacted_fields: Vec<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            system_path_key: "SYSTEM_PATH".to_string(),
            redacted_fields: vec!["SYSTEM_PATH".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry { key: String, value: String },
    Other(String),
}

/// A parsed container config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerConf {
    lines: Vec<Line>,
}

impl ContainerConf {
    /// Parse config text. Parsing never fails.
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|line| {
                let trimmed = line.trim();
                if trimmed.starts_with('#') {
                    return Line::Other(line.to_string());
                }
                match trimmed.split_once('=') {
                    Some((key, value)) if is_key(key) => Line::Entry {
                        key: key.to_string(),
                        value: value.to_string(),
                    },
                    _ => Line::Other(line.to_string()),
                }
            })
            .collect();
        Self { lines }
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Value of `key`, with surrounding quotes removed. The last assignment wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value } if k == key => Some(unquote(value)),
            _ => None,
        })
    }

    /// The config with every assignment to a redacted key removed.
    pub fn redacted(&self, fields: &[String]) -> Self {
        let lines = self
            .lines
            .iter()
            .filter(|line| match line {
                Line::Entry { key, .. } => !fields.iter().any(|f| f == key),
                Line::Other(_) => true,
            })
            .cloned()
            .collect();
        Self { lines }
    }
}

fn is_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
