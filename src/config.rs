//! Process-wide configuration constants: `spaces_per_indent` and
//! `overflow_char_cost` have a single process-wide value, exposed here as
//! a plain `toml`-deserializable struct rather than a singleton (`toml` +
//! `serde::Deserialize`, optionally read via `dirs`).

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Large relative to any practical rule/span cost, so a solution that
/// overflows the page width is always worse than one that doesn't, while
/// still comparable rather than "failing" outright.
pub const DEFAULT_OVERFLOW_CHAR_COST: u32 = 10_000;

pub const DEFAULT_SPACES_PER_INDENT: usize = 2;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub spaces_per_indent: usize,
    pub overflow_char_cost: u32,
    /// Escape hatch: preemption is a heuristic that can, on
    /// pathological-but-solvable input, produce a strictly worse
    /// rendering than a full search would have. Disabling it trades
    /// worst-case runtime for exactness; intended for tests and debugging,
    /// not production use on untrusted input.
    pub disable_preemption: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            spaces_per_indent: DEFAULT_SPACES_PER_INDENT,
            overflow_char_cost: DEFAULT_OVERFLOW_CHAR_COST,
            disable_preemption: false,
        }
    }
}

impl SplitterConfig {
    pub fn from_toml_str(src: &str) -> Result<Self> {
        toml::from_str(src).context("failed to parse splitter config as TOML")
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read splitter config at {}", path.display()))?;
        Self::from_toml_str(&src)
    }

    /// Looks for `linesplit.toml` in the user's config directory via
    /// `dirs`. Returns `Ok(None)` (not an error) when no such file exists,
    /// since the default config is always a valid fallback.
    pub fn discover() -> Result<Option<Self>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        let path = dir.join("linesplit.toml");
        if !path.exists() {
            return Ok(None);
        }
        Self::from_toml_file(&path).map(Some)
    }
}
