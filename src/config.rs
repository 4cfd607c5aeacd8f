//! Configuration loader and strongly typed settings structures.
//!
//! A single TOML file holds the connection settings, color presets,
//! highlight rules and window layout. The embedded defaults are
//! written out on first run so there is always a file to edit, and the
//! file can be reloaded mid-session without restarting.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::highlight::{HighlightStyle, Highlighter};
use crate::parser::spans::PresetMap;

const DEFAULT_CONFIG: &str = include_str!("../defaults/config.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub ui: UiConfig,
    /// preset id -> color pair, referenced by preset/style tags
    #[serde(default)]
    pub presets: HashMap<String, PresetColor>,
    #[serde(default)]
    pub highlights: Vec<HighlightPattern>,
    #[serde(default)]
    pub windows: Vec<WindowSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_buffer_lines")]
    pub buffer_lines: usize,
    /// Lines matching this pattern are mirrored into the logons window
    /// with a "Bounty: " prefix.
    #[serde(default = "default_bounty_pattern")]
    pub bounty_pattern: String,
}

fn default_buffer_lines() -> usize {
    3000
}

fn default_bounty_pattern() -> String {
    r"^You (?:have been tasked to|succeeded at your task)".to_string()
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            buffer_lines: default_buffer_lines(),
            bounty_pattern: default_bounty_pattern(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresetColor {
    pub fg: Option<String>,
    pub bg: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HighlightPattern {
    pub pattern: String,
    pub fg: Option<String>,
    pub bg: Option<String>,
    #[serde(default)]
    pub underline: bool,
}

/// A text window bound to a protocol stream, shown in the side column
/// in file order.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowSpec {
    pub stream: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_window_rows")]
    pub rows: u16,
}

fn default_window_rows() -> u16 {
    8
}

impl Config {
    /// ~/.vulgarity unless overridden on the command line.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vulgarity")
    }

    /// Load the config file, writing the embedded defaults out first
    /// if nothing exists at the path yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(path, DEFAULT_CONFIG)
                .with_context(|| format!("writing default config to {}", path.display()))?;
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn preset_map(&self) -> PresetMap {
        self.presets
            .iter()
            .map(|(id, c)| (id.clone(), (c.fg.clone(), c.bg.clone())))
            .collect()
    }

    pub fn build_highlighter(&self) -> Result<Highlighter> {
        Highlighter::build(self.highlights.iter().map(|h| {
            (
                h.pattern.as_str(),
                HighlightStyle {
                    fg: h.fg.clone(),
                    bg: h.bg.clone(),
                    underline: h.underline,
                },
            )
        }))
    }

    pub fn bounty_regex(&self) -> Result<regex::Regex> {
        regex::Regex::new(&self.ui.bounty_pattern)
            .with_context(|| format!("bad bounty pattern: {}", self.ui.bounty_pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).expect("default config");
        assert!(config.presets.contains_key("monsterbold"));
        assert!(config.presets.contains_key("link"));
        assert!(!config.windows.is_empty());
        config.build_highlighter().expect("default highlights");
        config.bounty_regex().expect("default bounty pattern");
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str("[connection]\n").expect("minimal");
        assert_eq!(config.connection.host, "127.0.0.1");
        assert_eq!(config.connection.port, 8000);
        assert_eq!(config.ui.buffer_lines, 3000);
        assert!(config.highlights.is_empty());
    }
}
