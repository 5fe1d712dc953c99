//! Pattern table for pane classification
//!
//! The table is plain data so it can be overridden from `config.toml`;
//! [`CompiledPatterns`] turns it into ready-to-match form once at startup.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lines inspected from the bottom of the pane for dialogs and markers.
pub const TAIL_LINES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatternTable {
    /// Regexes matched against the last content line; a hit means the agent
    /// exited back to a shell.
    pub shell_prompts: Vec<String>,
    /// Substrings (case-insensitive) showing the agent failed to start.
    pub spawn_failures: Vec<String>,
    /// Substrings (case-insensitive) of confirmation/permission dialogs.
    pub permission: Vec<String>,
    /// Substrings (case-insensitive) of the "no standing instructions" marker.
    pub no_policy_markers: Vec<String>,
    /// Substrings (case-insensitive) shown while output is streaming.
    pub active_indicators: Vec<String>,
    /// Exact contents of an empty input prompt line.
    pub prompt_chars: Vec<String>,
    /// Prefixes of status-bar chrome lines.
    pub status_bar_prefixes: Vec<String>,
}

impl Default for PatternTable {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            shell_prompts: owned(&[r"\w+@\w+.*[%$]\s*$", r"\[.*\][%$#]\s*$", r"^[~/].*[%$]\s*$"]),
            spawn_failures: owned(&[
                "command not found",
                "no such file or directory",
                "cannot execute",
            ]),
            permission: owned(&[
                "enter to confirm",
                "esc to reject",
                "allow this",
                "do you want to proceed",
                "❯ 1. yes",
                "tell claude what to do differently",
            ]),
            no_policy_markers: owned(&["no standing instructions"]),
            active_indicators: owned(&[
                "esc to interrupt",
                "thinking",
                "✽",
                "web search",
                "searching",
                "fetching",
                "pondering",
                "cogitating",
            ]),
            prompt_chars: owned(&[">", "›", "❯"]),
            status_bar_prefixes: owned(&["⏵⏵"]),
        }
    }
}

/// [`PatternTable`] with regexes compiled and substrings lowercased
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    shell_prompts: Vec<Regex>,
    spawn_failures: Vec<String>,
    permission: Vec<String>,
    no_policy_markers: Vec<String>,
    active_indicators: Vec<String>,
    prompt_chars: Vec<String>,
    status_bar_prefixes: Vec<String>,
    ansi: Regex,
    volatile: Vec<Regex>,
}

impl CompiledPatterns {
    pub fn compile(table: &PatternTable) -> Result<Self> {
        let shell_prompts = table
            .shell_prompts
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid shell prompt pattern: {p}")))
            .collect::<Result<Vec<_>>>()?;
        let lower = |items: &[String]| items.iter().map(|s| s.to_lowercase()).collect();

        // Chrome that changes every redraw without meaning new output.
        let volatile = [
            r"\b\d{1,2}:\d{2}(?::\d{2})?(?:\s*[AaPp][Mm])?\b",
            r"(?i)[↑↓]?\s*\d+(?:\.\d+)?k?\s+tokens?",
            r"\b\d+(?:\.\d+)?(?:ms|s|m|h)\b",
            r"[✽✻✶✳✢⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏]",
        ]
        .iter()
        .map(|p| Regex::new(p).context("Invalid volatile pattern"))
        .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            shell_prompts,
            spawn_failures: lower(&table.spawn_failures),
            permission: lower(&table.permission),
            no_policy_markers: lower(&table.no_policy_markers),
            active_indicators: lower(&table.active_indicators),
            prompt_chars: table.prompt_chars.clone(),
            status_bar_prefixes: table.status_bar_prefixes.clone(),
            ansi: Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").context("Invalid ANSI pattern")?,
            volatile,
        })
    }

    pub fn strip_ansi(&self, text: &str) -> String {
        self.ansi.replace_all(text, "").into_owned()
    }

    pub fn is_status_bar_line(&self, line: &str) -> bool {
        let trimmed = line.trim();
        self.status_bar_prefixes.iter().any(|p| trimmed.starts_with(p.as_str()))
    }

    /// Non-empty lines that are not status-bar chrome, in pane order.
    pub fn content_lines<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty() && !self.is_status_bar_line(l))
            .collect()
    }

    pub fn is_prompt_line(&self, line: &str) -> bool {
        let trimmed = line.trim();
        self.prompt_chars.iter().any(|p| p == trimmed)
    }

    pub fn is_shell_prompt(&self, line: &str) -> bool {
        !self.is_prompt_line(line) && self.shell_prompts.iter().any(|re| re.is_match(line))
    }

    pub fn find_spawn_failure(&self, haystack: &str) -> Option<&str> {
        find_marker(&self.spawn_failures, haystack)
    }

    pub fn find_permission(&self, haystack: &str) -> Option<&str> {
        find_marker(&self.permission, haystack)
    }

    pub fn find_no_policy(&self, haystack: &str) -> Option<&str> {
        find_marker(&self.no_policy_markers, haystack)
    }

    pub fn find_active(&self, haystack: &str) -> Option<&str> {
        find_marker(&self.active_indicators, haystack)
    }

    /// Normalized form used for change comparison: no ANSI, no volatile
    /// chrome, no status bar, no trailing whitespace or blank lines.
    pub fn normalize(&self, text: &str) -> String {
        let plain = self.strip_ansi(text);
        let mut lines = Vec::new();
        for line in plain.lines() {
            if self.is_status_bar_line(line) {
                continue;
            }
            let mut cleaned = line.to_string();
            for re in &self.volatile {
                cleaned = re.replace_all(&cleaned, "").into_owned();
            }
            lines.push(cleaned.trim_end().to_string());
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}

/// First marker contained in the lowercased haystack.
fn find_marker<'a>(markers: &'a [String], haystack: &str) -> Option<&'a str> {
    let lowered = haystack.to_lowercase();
    markers
        .iter()
        .find(|m| lowered.contains(m.as_str()))
        .map(String::as_str)
}
