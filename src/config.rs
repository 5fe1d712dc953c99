//! Settings loaded from `<state_dir>/config.toml`
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! A file that exists but does not parse is an error naming the path.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::detect::PatternTable;
use crate::fs::locking::read_optional;
use crate::fs::StateDir;
use crate::models::constants::{
    DEFAULT_ARCHIVE_AFTER_SECS, DEFAULT_CAPTURE_LINES, DEFAULT_FOLLOW_POLL_MS,
    DEFAULT_POLL_INTERVAL_SECS, HOOK_FRESH_SECS, HOOK_STALE_SECS, MAX_POLL_INTERVAL_SECS,
    MIN_POLL_INTERVAL_SECS, UNCONFIDENT_STREAK_LIMIT,
};
use crate::models::metrics::UsageTotals;

/// Prices in USD per million tokens
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input: 15.0,
            output: 75.0,
            cache_write: 18.75,
            cache_read: 1.50,
        }
    }
}

impl Pricing {
    pub fn cost_of(&self, usage: &UsageTotals) -> f64 {
        const PER: f64 = 1_000_000.0;
        usage.input_tokens as f64 / PER * self.input
            + usage.output_tokens as f64 / PER * self.output
            + usage.cache_creation_tokens as f64 / PER * self.cache_write
            + usage.cache_read_tokens as f64 / PER * self.cache_read
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// tmux session that hosts one window per agent
    pub tmux_session: String,
    /// Command started in each new window
    pub agent_command: String,
    pub poll_interval_secs: u64,
    pub capture_lines: usize,
    pub hook_fresh_secs: u64,
    pub hook_stale_secs: u64,
    pub unconfident_streak: u32,
    pub archive_after_secs: u64,
    pub follow_poll_ms: u64,
    pub pricing: Pricing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<PatternTable>,
    /// Where the agent runtime keeps session transcripts.
    /// Defaults to `~/.claude/projects`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcripts_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tmux_session: "agents".to_string(),
            agent_command: "claude".to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            capture_lines: DEFAULT_CAPTURE_LINES,
            hook_fresh_secs: HOOK_FRESH_SECS,
            hook_stale_secs: HOOK_STALE_SECS,
            unconfident_streak: UNCONFIDENT_STREAK_LIMIT,
            archive_after_secs: DEFAULT_ARCHIVE_AFTER_SECS,
            follow_poll_ms: DEFAULT_FOLLOW_POLL_MS,
            pricing: Pricing::default(),
            patterns: None,
            transcripts_dir: None,
        }
    }
}

impl Settings {
    pub fn load(state: &StateDir) -> Result<Self> {
        let path = state.config_file();
        let Some(content) = read_optional(&path)? else {
            return Ok(Self::default());
        };
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loop interval, clamped to the supported range.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS),
        )
    }

    pub fn follow_poll(&self) -> Duration {
        Duration::from_millis(self.follow_poll_ms.max(10))
    }

    pub fn hook_fresh(&self) -> Duration {
        Duration::from_secs(self.hook_fresh_secs)
    }

    pub fn hook_stale(&self) -> Duration {
        Duration::from_secs(self.hook_stale_secs)
    }

    pub fn archive_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.archive_after_secs.min(i64::MAX as u64) as i64)
    }

    pub fn pattern_table(&self) -> PatternTable {
        self.patterns.clone().unwrap_or_default()
    }

    pub fn transcripts_root(&self) -> Option<PathBuf> {
        self.transcripts_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".claude").join("projects")))
    }
}
