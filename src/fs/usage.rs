//! Cumulative token usage per session
//!
//! The primary source is the agent runtime's own transcript,
//! `<projects>/<encoded working dir>/<runtime session id>.jsonl`, where
//! every assistant message carries a `usage` block. A per-session
//! `usage/<name>.json` file is the fallback when no transcript is found.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::locking::{atomic_write, read_optional};
use super::state_dir::StateDir;
use crate::models::metrics::UsageTotals;

#[derive(Debug, Deserialize)]
struct TranscriptEntry {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: Option<TranscriptMessage>,
}

#[derive(Debug, Deserialize)]
struct TranscriptMessage {
    #[serde(default)]
    usage: Option<TranscriptUsage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TranscriptUsage {
    input_tokens: u64,
    output_tokens: u64,
    cache_creation_input_tokens: u64,
    cache_read_input_tokens: u64,
}

/// Directory name the runtime uses for a project: `/home/u/app` -> `-home-u-app`.
pub fn encode_project_path(dir: &Path) -> String {
    let resolved = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    resolved.to_string_lossy().replace('/', "-")
}

pub fn transcript_path(projects: &Path, working_dir: &Path, runtime_session_id: &str) -> PathBuf {
    projects
        .join(encode_project_path(working_dir))
        .join(format!("{runtime_session_id}.jsonl"))
}

/// Sum the usage of every assistant message in a transcript.
///
/// Returns `None` when the transcript does not exist. Lines that fail to
/// parse are skipped, since the runtime may be mid-write on the last one.
pub fn read_transcript_usage(path: &Path) -> Result<Option<UsageTotals>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open transcript: {}", path.display()))
        }
    };

    let mut totals = UsageTotals::default();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read transcript: {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: TranscriptEntry = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(path = %path.display(), line = index + 1, error = %e, "skipping transcript line");
                continue;
            }
        };
        if entry.kind != "assistant" {
            continue;
        }
        if let Some(usage) = entry.message.and_then(|m| m.usage) {
            totals.add(&UsageTotals {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                cache_creation_tokens: usage.cache_creation_input_tokens,
                cache_read_tokens: usage.cache_read_input_tokens,
            });
        }
    }
    Ok(Some(totals))
}

/// Current usage for one session: its transcript when the runtime session
/// id is known and the transcript exists, otherwise the usage file.
pub fn sync_usage(
    state: &StateDir,
    session: &str,
    working_dir: &Path,
    runtime_session_id: Option<&str>,
    projects: Option<&Path>,
) -> Result<Option<UsageTotals>> {
    if let (Some(id), Some(projects)) = (runtime_session_id.filter(|id| !id.is_empty()), projects) {
        if let Some(usage) = read_transcript_usage(&transcript_path(projects, working_dir, id))? {
            return Ok(Some(usage));
        }
    }
    read_usage(state, session)
}

/// Read the cumulative usage for `session`. A missing file means no data.
pub fn read_usage(state: &StateDir, session: &str) -> Result<Option<UsageTotals>> {
    let path = state.usage_file(session);
    let Some(content) = read_optional(&path)? else {
        return Ok(None);
    };
    let usage = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse usage file: {}", path.display()))?;
    Ok(Some(usage))
}

pub fn write_usage(state: &StateDir, session: &str, usage: &UsageTotals) -> Result<()> {
    let content = serde_json::to_string_pretty(usage).context("Failed to serialize usage")?;
    atomic_write(&state.usage_file(session), &content)
}
