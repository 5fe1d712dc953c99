use anyhow::{Context, Result};

use super::locking::{atomic_write, read_optional};
use super::state_dir::StateDir;
use crate::models::hook::HookRecord;

/// Latest-record-wins store for hook events, one file per session.
#[derive(Debug, Clone)]
pub struct HookStore {
    state: StateDir,
}

impl HookStore {
    pub fn new(state: StateDir) -> Self {
        Self { state }
    }

    pub fn write(&self, session: &str, record: &HookRecord) -> Result<()> {
        let content = serde_json::to_string(record).context("Failed to serialize hook record")?;
        atomic_write(&self.state.hook_file(session), &content)
    }

    /// Latest record for `session`. Missing or malformed files give `None`.
    pub fn latest(&self, session: &str) -> Option<HookRecord> {
        let path = self.state.hook_file(session);
        match read_optional(&path) {
            Ok(Some(content)) => match serde_json::from_str(&content) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::debug!(session, error = %e, "ignoring malformed hook record");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(session, error = %e, "hook record unreadable");
                None
            }
        }
    }

    pub fn clear(&self, session: &str) -> Result<()> {
        let path = self.state.hook_file(session);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}
