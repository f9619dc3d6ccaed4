//! Terminal configuration.

use anyhow::Context;
use core_cells::{Rgb, rgb_from_index};
use serde::{Deserialize, Serialize};

/// Knobs the host can set once at construction. Deserializable so hosts
/// that keep a TOML config file can embed a `[terminal]` table directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Main-screen history: the ring keeps `history_limit - 1` lines.
    pub history_limit: usize,
    /// Default tab stop interval.
    pub tab_interval: usize,
    pub default_fg: Rgb,
    pub default_bg: Rgb,
    /// Characters that separate words for snap-to-word selection.
    pub word_delimiters: String,
    /// Whether applications may switch to the alternate screen.
    pub allow_altscreen: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_limit: 10_000,
            tab_interval: 8,
            default_fg: rgb_from_index(7),
            default_bg: rgb_from_index(0),
            word_delimiters: " ".to_string(),
            allow_altscreen: true,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("parsing terminal config")
    }
}
