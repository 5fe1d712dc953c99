use anyhow::{Context, Result};

use super::locking::{atomic_write, read_optional};
use super::state_dir::StateDir;
use crate::models::snapshot::DaemonSnapshot;

/// Publish a snapshot by whole-file replacement.
pub fn publish_snapshot(state: &StateDir, snapshot: &DaemonSnapshot) -> Result<()> {
    let content =
        serde_json::to_string_pretty(snapshot).context("Failed to serialize daemon snapshot")?;
    atomic_write(&state.snapshot_file(), &content)
}

/// Latest published snapshot, if any.
pub fn load_snapshot(state: &StateDir) -> Result<Option<DaemonSnapshot>> {
    let path = state.snapshot_file();
    let Some(content) = read_optional(&path)? else {
        return Ok(None);
    };
    let snapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
    Ok(Some(snapshot))
}
