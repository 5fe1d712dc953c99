//! tmux process host
//!
//! All agents share one tmux session; each agent gets its own window,
//! addressed by its stable `#{window_id}` so renames cannot break lookups.

mod helpers;
mod types;

use anyhow::{bail, Context, Result};
use std::path::Path;

use super::ProcessHost;
use crate::models::session::WindowHandle;

pub use helpers::check_tmux_available;
pub use types::TMUX_DEBOUNCE_MS;

use helpers::{parse_window_ids, run_tmux, run_tmux_checked, send_keys_debounced, send_literal};

pub struct TmuxHost {
    /// tmux session holding every agent window
    group: String,
}

impl TmuxHost {
    pub fn new(group: impl Into<String>) -> Result<Self> {
        check_tmux_available()?;
        Ok(Self {
            group: group.into(),
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    fn group_exists(&self) -> Result<bool> {
        Ok(run_tmux(&["has-session", "-t", &self.group])?.success)
    }
}

impl ProcessHost for TmuxHost {
    fn create_window(&self, name: &str, dir: &Path) -> Result<WindowHandle> {
        let dir = dir
            .to_str()
            .with_context(|| format!("Working directory is not valid UTF-8: {}", dir.display()))?;

        let stdout = if self.group_exists()? {
            let target = format!("{}:", self.group);
            run_tmux_checked(
                &[
                    "new-window", "-d", "-t", &target, "-n", name, "-c", dir, "-P", "-F",
                    "#{window_id}",
                ],
                "create tmux window",
            )?
        } else {
            run_tmux_checked(
                &[
                    "new-session", "-d", "-s", &self.group, "-n", name, "-c", dir, "-P", "-F",
                    "#{window_id}",
                ],
                "create tmux session",
            )?
        };

        let id = stdout.trim();
        if !id.starts_with('@') {
            bail!("tmux returned an unexpected window id: '{id}'");
        }
        tracing::debug!(window = id, name, "created tmux window");
        Ok(WindowHandle::new(self.group.clone(), id))
    }

    fn capture_text(&self, handle: &WindowHandle, max_lines: usize) -> Result<String> {
        let start = format!("-{max_lines}");
        run_tmux_checked(
            &["capture-pane", "-p", "-J", "-t", &handle.id, "-S", &start],
            "capture pane",
        )
    }

    fn send_keys(&self, handle: &WindowHandle, text: &str, press_enter: bool) -> Result<()> {
        if press_enter {
            send_keys_debounced(&handle.id, text, TMUX_DEBOUNCE_MS)
        } else {
            send_literal(&handle.id, text)
        }
    }

    fn list_windows(&self) -> Result<Vec<WindowHandle>> {
        let output = run_tmux(&["list-windows", "-t", &self.group, "-F", "#{window_id}"])?;
        if !output.success {
            // No tmux session means no windows.
            return Ok(Vec::new());
        }
        Ok(parse_window_ids(&output.stdout)
            .into_iter()
            .map(|id| WindowHandle::new(self.group.clone(), id))
            .collect())
    }

    fn kill_window(&self, handle: &WindowHandle) -> Result<()> {
        run_tmux_checked(&["kill-window", "-t", &handle.id], "kill tmux window")?;
        Ok(())
    }
}
